//! # dam-vault
//!
//! Custody primitives the Dam engine builds on.
//!
//! The engine never holds principal directly: it parks it in an
//! [`Embankment`](embankment::Embankment), a share-based vault whose
//! redeemable value grows as yield arrives. Asset balances themselves live in
//! a [`Token`](token::Token) ledger.
//!
//! ## Modules
//!
//! - [`token`]: Fungible asset ledger with allowances and signed permits
//! - [`embankment`]: Share vault with a virtual offset

pub mod embankment;
pub mod token;

use dam_types::Address;

/// Error types for the asset ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// Sender balance too low.
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance {
        /// Amount requested.
        needed: u128,
        /// Amount held.
        available: u128,
    },

    /// Spender allowance too low.
    #[error("insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance {
        /// Amount requested.
        needed: u128,
        /// Amount approved.
        available: u128,
    },

    /// The receiving account refuses incoming transfers.
    #[error("transfer rejected by receiver {0}")]
    TransferRejected(Address),

    /// Empty address used as a party.
    #[error("empty address")]
    InvalidAddress,

    /// Permit deadline has passed.
    #[error("permit expired at {deadline}, now {now}")]
    PermitExpired {
        /// Permit deadline.
        deadline: u64,
        /// Current time.
        now: u64,
    },

    /// Permit signature did not verify against the owner.
    #[error("invalid permit signature")]
    InvalidPermit,

    /// Arithmetic overflow.
    #[error("arithmetic overflow in asset ledger")]
    Overflow,
}

/// Error types for vault operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// Only the bound operator may move funds.
    #[error("caller {0} is not the vault operator")]
    Unauthorized(Address),

    /// The ledger passed in is not the vault's asset.
    #[error("asset mismatch: vault holds {expected}, got {actual}")]
    AssetMismatch {
        /// The vault's bound asset.
        expected: Address,
        /// The ledger supplied.
        actual: Address,
    },

    /// Withdrawal above what the owner's shares are worth.
    #[error("withdraw of {requested} exceeds max {max}")]
    ExceedsMaxWithdraw {
        /// Requested assets.
        requested: u128,
        /// Redeemable value.
        max: u128,
    },

    /// Redeem above the owner's share balance.
    #[error("redeem of {requested} shares exceeds balance {balance}")]
    ExceedsShares {
        /// Requested shares.
        requested: u128,
        /// Shares held.
        balance: u128,
    },

    /// Underlying asset transfer failed.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in share conversion")]
    Overflow,
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
