//! # dam-accounting
//!
//! Basis-point accounting for yield distribution.
//!
//! All arithmetic is integer-only with floor division. Wherever a split would
//! lose dust to rounding, one designated party absorbs the remainder so the
//! parts always sum to the whole.
//!
//! ## Modules
//!
//! - [`percentage`]: `mul_to` and ratio validation
//! - [`incentive`]: Reinvested / distributable split of round yield
//! - [`payout`]: Per-receiver payout planning

pub mod incentive;
pub mod payout;
pub mod percentage;

/// Error types for accounting operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountingError {
    /// Basis points above 10000.
    #[error("ratio {bp} exceeds 10000 basis points")]
    InvalidRatio {
        /// The offending value.
        bp: u16,
    },

    /// Distribution proportions do not sum to 10000.
    #[error("proportions must sum to 10000, got {total}")]
    InvalidProportion {
        /// The actual total.
        total: u32,
    },

    /// Receivers and proportions have different lengths.
    #[error("length mismatch: {receivers} receivers, {proportions} proportions")]
    LengthMismatch {
        /// Number of receivers.
        receivers: usize,
        /// Number of proportions.
        proportions: usize,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in accounting calculation")]
    Overflow,
}

/// Convenience result type for accounting operations.
pub type Result<T> = std::result::Result<T, AccountingError>;
