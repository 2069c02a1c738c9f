//! # dam-types
//!
//! Shared domain types used across the Dam workspace: addresses, asset
//! amounts, basis points and the event records the engine emits.

pub mod address;
pub mod amount;
pub mod events;

pub use address::Address;
pub use amount::Amount;

/// Basis points. `10_000` is one whole.
pub type Bp = u16;

/// Basis-point denominator.
pub const MAX_BP: Bp = 10_000;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Error for parsing textual forms of shared types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The input was not valid hex or had the wrong length.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
