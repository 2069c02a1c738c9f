//! Round incentive computation.
//!
//! At the end of a round the vault's redeemable value exceeds the engine's
//! principal by the yield accrued during the round. Part of that yield is
//! reinvested (it stays in the vault and is folded into principal); the rest
//! is distributable.
//!
//! ```text
//! yield         = total_assets - principal
//! distributable = mul_to(yield, 10000 - reinvest_bp)   (reinvest_bp > 0)
//! reinvested    = yield - distributable
//! ```

use serde::{Deserialize, Serialize};

use dam_types::Bp;

use crate::percentage::{complement, ensure_ratio, mul_to};
use crate::Result;

/// The split of one round's yield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveSplit {
    /// Amount paid out to receivers.
    pub distributable: u128,
    /// Amount kept in the vault and added to principal.
    pub reinvested: u128,
}

impl IncentiveSplit {
    /// Total yield the split was computed from.
    ///
    /// [`split_yield`] keeps the two halves summing to the input yield; a
    /// hand-built split saturates at `u128::MAX`.
    pub fn total_yield(&self) -> u128 {
        self.distributable.saturating_add(self.reinvested)
    }
}

/// Split a yield amount by the reinvestment ratio.
///
/// # Errors
///
/// - [`crate::AccountingError::InvalidRatio`] if `reinvest_bp > 10000`
pub fn split_yield(yield_amount: u128, reinvest_bp: Bp) -> Result<IncentiveSplit> {
    ensure_ratio(reinvest_bp)?;
    if reinvest_bp == 0 {
        return Ok(IncentiveSplit {
            distributable: yield_amount,
            reinvested: 0,
        });
    }

    let distributable = mul_to(yield_amount, complement(reinvest_bp)?)?;
    Ok(IncentiveSplit {
        distributable,
        reinvested: yield_amount - distributable,
    })
}

/// Compute the split from the vault's total assets and the engine principal.
///
/// Yield is clamped at zero: if the vault reports less than principal (for
/// example one unit lost to share rounding) there is nothing to distribute.
pub fn compute_incentive(total_assets: u128, principal: u128, reinvest_bp: Bp) -> Result<IncentiveSplit> {
    let yield_amount = match total_assets.checked_sub(principal) {
        Some(y) => y,
        None => {
            tracing::warn!(
                total_assets,
                principal,
                "redeemable value below principal, treating yield as zero"
            );
            0
        }
    };
    split_yield(yield_amount, reinvest_bp)
}
