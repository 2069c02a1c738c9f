//! Fixed-point basis-point arithmetic.
//!
//! ```text
//! mul_to(amount, bp) = floor(amount * bp / 10000)
//! ```
//!
//! Rounding is always toward zero. There is no banker's rounding anywhere.

use dam_types::{Bp, MAX_BP};

use crate::{AccountingError, Result};

/// Take `bp` basis points of `amount`, rounding down.
///
/// # Errors
///
/// - [`AccountingError::InvalidRatio`] if `bp > 10000`
/// - [`AccountingError::Overflow`] if `amount * bp` does not fit in `u128`
pub fn mul_to(amount: u128, bp: Bp) -> Result<u128> {
    ensure_ratio(bp)?;
    let scaled = amount
        .checked_mul(u128::from(bp))
        .ok_or(AccountingError::Overflow)?;
    Ok(scaled / u128::from(MAX_BP))
}

/// Reject ratios above one whole.
pub fn ensure_ratio(bp: Bp) -> Result<()> {
    if bp > MAX_BP {
        return Err(AccountingError::InvalidRatio { bp });
    }
    Ok(())
}

/// The complement `10000 - bp`.
pub fn complement(bp: Bp) -> Result<Bp> {
    ensure_ratio(bp)?;
    Ok(MAX_BP - bp)
}
