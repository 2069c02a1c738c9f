//! Per-receiver payout planning.
//!
//! Each receiver is paid `mul_to(total, proportion)` in the order supplied,
//! except the last receiver, who gets whatever is left. That removes floor
//! rounding dust so the payouts always sum to exactly `total`.

use serde::{Deserialize, Serialize};

use dam_types::{Address, Bp, MAX_BP};

use crate::percentage::mul_to;
use crate::{AccountingError, Result};

/// A single planned transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Who receives the funds.
    pub receiver: Address,
    /// How much they receive.
    pub amount: u128,
}

/// Check that proportions sum to exactly one whole.
///
/// # Errors
///
/// - [`AccountingError::InvalidProportion`] if the sum differs from 10000
pub fn validate_proportions(proportions: &[Bp]) -> Result<()> {
    let total: u32 = proportions.iter().map(|bp| u32::from(*bp)).sum();
    if total != u32::from(MAX_BP) {
        return Err(AccountingError::InvalidProportion { total });
    }
    Ok(())
}

/// Plan the payouts of `total` across `receivers` by `proportions`.
///
/// # Errors
///
/// - [`AccountingError::LengthMismatch`] if the two slices differ in length
/// - [`AccountingError::InvalidProportion`] if proportions do not sum to 10000
pub fn plan_payouts(total: u128, receivers: &[Address], proportions: &[Bp]) -> Result<Vec<Payout>> {
    if receivers.len() != proportions.len() {
        return Err(AccountingError::LengthMismatch {
            receivers: receivers.len(),
            proportions: proportions.len(),
        });
    }
    validate_proportions(proportions)?;

    let last = receivers.len() - 1;
    let mut paid: u128 = 0;
    let mut payouts = Vec::with_capacity(receivers.len());

    for (i, (receiver, bp)) in receivers.iter().zip(proportions).enumerate() {
        let amount = if i == last {
            total - paid
        } else {
            mul_to(total, *bp)?
        };
        paid = paid.checked_add(amount).ok_or(AccountingError::Overflow)?;
        payouts.push(Payout {
            receiver: *receiver,
            amount,
        });
    }

    tracing::trace!(total, receivers = payouts.len(), "payouts planned");

    Ok(payouts)
}
