//! # dam-core
//!
//! The round-based yield distribution engine.
//!
//! A [`Dam`] keeps principal in an [`Embankment`](dam_vault::embankment::Embankment)
//! and advances through fixed-length rounds. At each round boundary the
//! controller or oracle submits oracle-attested distribution data; the engine
//! measures the yield the vault accrued, reinvests part of it, pays the rest
//! out by the attested proportions, processes any scheduled withdrawal, and
//! opens the next round while it is still flowing.
//!
//! ## Modules
//!
//! - [`access`]: Controller and oracle roles
//! - [`state`]: Durable engine state
//! - [`engine`]: The state machine

pub mod access;
pub mod engine;
pub mod state;

pub use engine::{CallContext, Dam, RoundOutcome, WithdrawalOutcome};
pub use state::{DamState, Phase, Round, ScheduledWithdrawal, UpstreamConfig};

use dam_accounting::AccountingError;
use dam_oracle::OracleError;
use dam_types::Address;
use dam_vault::{AssetError, VaultError};

/// Error types for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DamError {
    // Configuration
    /// Round period of zero.
    #[error("round period must be greater than zero")]
    InvalidPeriod,

    /// Ratio above 10000 basis points.
    #[error("ratio {bp} exceeds 10000 basis points")]
    InvalidRatio {
        /// The offending value.
        bp: u16,
    },

    /// Empty address where a key or role holder is required.
    #[error("empty address")]
    InvalidAddress,

    /// Zero, or the whole principal (which must go through decommission).
    #[error("invalid withdrawal amount")]
    InvalidAmountRequest,

    /// Empty withdrawal receiver.
    #[error("invalid receiver")]
    InvalidReceiver,

    // State preconditions
    /// `operate` while already flowing.
    #[error("dam is already operating")]
    AlreadyOperating,

    /// Operation requires the dam to be flowing.
    #[error("dam is not operating")]
    NotOperating,

    /// Operation requires the dam to have stopped flowing.
    #[error("dam is still operating")]
    StillOperating,

    /// No round to end, or its end time has not been reached.
    #[error("round has not ended")]
    RoundNotEnded,

    /// Withdrawal above principal.
    #[error("insufficient balance: requested {requested}, principal {principal}")]
    InsufficientBalance {
        /// Requested amount.
        requested: u128,
        /// Current principal.
        principal: u128,
    },

    // Integrity
    /// Attestation not signed by the oracle key.
    #[error("invalid signature")]
    InvalidSignature,

    /// Distribution proportions do not sum to 10000.
    #[error("proportions must sum to 10000, got {total}")]
    InvalidProportion {
        /// The actual sum.
        total: u32,
    },

    /// Distribution payload could not be decoded.
    #[error("malformed distribution data: {0}")]
    MalformedData(String),

    // Authorization
    /// Caller lacks the required role.
    #[error("caller {0} is not authorized")]
    Unauthorized(Address),

    // Collaborators
    /// Vault operation failed.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Asset ledger operation failed.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Arithmetic failure in accounting.
    #[error("accounting error: {0}")]
    Accounting(AccountingError),
}

impl From<AccountingError> for DamError {
    fn from(e: AccountingError) -> Self {
        match e {
            AccountingError::InvalidRatio { bp } => DamError::InvalidRatio { bp },
            AccountingError::InvalidProportion { total } => DamError::InvalidProportion { total },
            AccountingError::LengthMismatch { .. } => DamError::MalformedData(e.to_string()),
            AccountingError::Overflow => DamError::Accounting(e),
        }
    }
}

impl From<OracleError> for DamError {
    fn from(e: OracleError) -> Self {
        match e {
            OracleError::InvalidSignature => DamError::InvalidSignature,
            OracleError::MalformedData(msg) | OracleError::Serialization(msg) => {
                DamError::MalformedData(msg)
            }
        }
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, DamError>;
