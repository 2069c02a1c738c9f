//! Configuration file management.
//!
//! The daemon reads `config.toml` from `$DAM_DATA_DIR` (or a per-platform
//! default). Every field has a default, so a missing file or a partial one
//! still yields a runnable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use dam_crypto::ed25519::SigningKey;
use dam_oracle::distribution::DistributionData;
use dam_types::{Address, Bp};

/// Errors turning configuration into runtime values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid receiver address {address:?}: {reason}")]
    InvalidReceiver { address: String, reason: String },

    #[error("invalid oracle seed: {0}")]
    InvalidOracleSeed(String),

    #[error("distribution has no receivers")]
    EmptyDistribution,
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Round parameters and the opening deposit.
    #[serde(default)]
    pub upstream: UpstreamSection,
    /// Oracle signing key.
    #[serde(default)]
    pub oracle: OracleSection,
    /// Who receives each round's incentive.
    #[serde(default)]
    pub distribution: DistributionSection,
    /// Simulated yield source.
    #[serde(default)]
    pub simulation: SimulationSection,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Upstream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSection {
    /// Round length in seconds.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
    /// Share of yield kept as principal, in basis points.
    #[serde(default)]
    pub reinvestment_ratio_bp: Bp,
    /// Downstream split recorded with the engine, in basis points.
    #[serde(default)]
    pub auto_stream_ratio_bp: Bp,
    /// Principal deposited when the dam starts.
    #[serde(default = "default_initial_deposit")]
    pub initial_deposit: u64,
}

/// Oracle configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleSection {
    /// Hex-encoded 32-byte Ed25519 seed. Empty = generate one per run.
    #[serde(default)]
    pub seed_hex: String,
}

/// One distribution entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverEntry {
    /// Hex address, optionally `0x`-prefixed.
    pub address: String,
    /// Proportion in basis points.
    pub proportion_bp: Bp,
}

/// Distribution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSection {
    /// Ordered receivers. The last one absorbs rounding remainder.
    #[serde(default = "default_receivers")]
    pub receivers: Vec<ReceiverEntry>,
}

/// Simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Yield minted into the vault before each round closes.
    #[serde(default = "default_yield_per_round")]
    pub yield_per_round: u64,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How often the scheduler checks whether the round can close.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

// Default value functions

fn default_period_secs() -> u64 {
    24 * 60 * 60
}

fn default_initial_deposit() -> u64 {
    1_000_000
}

fn default_receivers() -> Vec<ReceiverEntry> {
    vec![ReceiverEntry {
        address: Address::from_label("treasury").to_hex(),
        proportion_bp: 10_000,
    }]
}

fn default_yield_per_round() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_secs() -> u64 {
    5
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
            reinvestment_ratio_bp: 0,
            auto_stream_ratio_bp: 0,
            initial_deposit: default_initial_deposit(),
        }
    }
}

impl Default for DistributionSection {
    fn default() -> Self {
        Self {
            receivers: default_receivers(),
        }
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            yield_per_round: default_yield_per_round(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tick_secs: default_tick_secs(),
            data_dir: String::new(),
        }
    }
}

impl OracleSection {
    /// The configured oracle key, or a fresh one if no seed is set.
    pub fn signing_key(&self) -> Result<SigningKey, ConfigError> {
        if self.seed_hex.trim().is_empty() {
            tracing::warn!("no oracle seed configured, generating an ephemeral key");
            return Ok(SigningKey::generate());
        }
        SigningKey::from_hex(&self.seed_hex).map_err(|e| ConfigError::InvalidOracleSeed(e.to_string()))
    }
}

impl DistributionSection {
    /// Parse receivers into round-ending data. Proportion sums are checked
    /// by the engine when the round closes.
    pub fn to_data(&self) -> Result<DistributionData, ConfigError> {
        if self.receivers.is_empty() {
            return Err(ConfigError::EmptyDistribution);
        }
        let pairs = self
            .receivers
            .iter()
            .map(|entry| {
                entry
                    .address
                    .parse::<Address>()
                    .map(|address| (address, entry.proportion_bp))
                    .map_err(|e| ConfigError::InvalidReceiver {
                        address: entry.address.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DistributionData::from_pairs(&pairs))
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.advanced.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.advanced.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// `$DAM_DATA_DIR`, else a dot directory under `$HOME`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("DAM_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".dam"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/dam"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.upstream.period_secs, 86_400);
        assert_eq!(config.upstream.initial_deposit, 1_000_000);
        assert_eq!(config.distribution.receivers.len(), 1);
        assert_eq!(config.distribution.receivers[0].proportion_bp, 10_000);
        assert_eq!(config.advanced.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.distribution.receivers, config.distribution.receivers);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [upstream]
            period_secs = 3600
            reinvestment_ratio_bp = 500
            "#,
        )
        .expect("parse");
        assert_eq!(config.upstream.period_secs, 3_600);
        assert_eq!(config.upstream.reinvestment_ratio_bp, 500);
        assert_eq!(config.upstream.initial_deposit, 1_000_000);
        assert_eq!(config.simulation.yield_per_round, 1_000);
    }

    #[test]
    fn test_distribution_to_data() {
        let a = Address::from_label("a");
        let b = Address::from_label("b");
        let section = DistributionSection {
            receivers: vec![
                ReceiverEntry {
                    address: format!("0x{}", a.to_hex()),
                    proportion_bp: 9_000,
                },
                ReceiverEntry {
                    address: b.to_hex(),
                    proportion_bp: 1_000,
                },
            ],
        };
        let data = section.to_data().expect("data");
        assert_eq!(data.receivers, vec![a, b]);
        assert_eq!(data.proportions_bp, vec![9_000, 1_000]);
    }

    #[test]
    fn test_distribution_rejects_bad_input() {
        let empty = DistributionSection { receivers: vec![] };
        assert!(matches!(empty.to_data(), Err(ConfigError::EmptyDistribution)));

        let bad = DistributionSection {
            receivers: vec![ReceiverEntry {
                address: "not-hex".to_string(),
                proportion_bp: 10_000,
            }],
        };
        assert!(matches!(
            bad.to_data(),
            Err(ConfigError::InvalidReceiver { .. })
        ));
    }

    #[test]
    fn test_oracle_seed() {
        let section = OracleSection {
            seed_hex: hex::encode([9u8; 32]),
        };
        let key = section.signing_key().expect("key");
        assert_eq!(key.to_bytes(), [9u8; 32]);

        let bad = OracleSection {
            seed_hex: "abcd".to_string(),
        };
        assert!(matches!(
            bad.signing_key(),
            Err(ConfigError::InvalidOracleSeed(_))
        ));
    }
}
