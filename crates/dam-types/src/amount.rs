//! Withdrawal amounts.

use serde::{Deserialize, Serialize};

/// How much to withdraw: a fixed number of asset units, or everything the
/// engine holds at the time the withdrawal is processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amount {
    /// Exactly this many asset units.
    Exact(u128),
    /// The full redeemable value.
    All,
}

impl Amount {
    /// Resolve against the currently available value.
    pub fn resolve(&self, available: u128) -> u128 {
        match self {
            Amount::Exact(n) => *n,
            Amount::All => available,
        }
    }
}
