//! # dam-oracle
//!
//! Oracle attestation of round-ending distribution data.
//!
//! The split of each round's incentive is computed off the engine and signed
//! by a single oracle key. The engine only checks that the payload it is
//! handed was attested by the registered key, then decodes it.
//!
//! ## Modules
//!
//! - [`attestation`]: `Attestation`, the verifier trait and its Ed25519 implementation
//! - [`distribution`]: CBOR codec for receivers and proportions

pub mod attestation;
pub mod distribution;

/// Error types for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The attestation was not produced by the expected signer.
    #[error("invalid signature")]
    InvalidSignature,

    /// Payload could not be decoded into distribution data.
    #[error("malformed distribution data: {0}")]
    MalformedData(String),

    /// Payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
