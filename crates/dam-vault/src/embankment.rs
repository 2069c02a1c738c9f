//! Share-based custodial vault.
//!
//! The Embankment holds an asset balance on the [`Token`] ledger and issues
//! shares against it. Yield arriving at the vault raises the value of every
//! share; the engine measures its accrued yield through
//! [`Embankment::redeemable_value`].
//!
//! ## Share price
//!
//! ```text
//! shares = assets * (total_shares + VIRTUAL_SHARES) / (total_assets + VIRTUAL_ASSETS)
//! assets = shares * (total_assets + VIRTUAL_ASSETS) / (total_shares + VIRTUAL_SHARES)
//! ```
//!
//! The virtual offset means a first depositor cannot inflate the share price
//! by donating assets into an empty vault: the donation is split with the
//! virtual shares and the attack costs more than it can steal.

use std::collections::BTreeMap;

use dam_types::Address;

use crate::token::Token;
use crate::{Result, VaultError};

/// Virtual shares added to the supply in every conversion (10^3 offset).
pub const VIRTUAL_SHARES: u128 = 1_000;

/// Virtual assets added to the balance in every conversion.
pub const VIRTUAL_ASSETS: u128 = 1;

/// Rounding direction for share conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Floor,
    Ceil,
}

#[allow(dead_code, clippy::all, clippy::unwrap_used, clippy::panic)]
mod wide {
    uint::construct_uint! {
        /// 256-bit intermediate for share conversions.
        pub struct U256(4);
    }
}

use wide::U256;

/// `x * numerator / denominator` over a 256-bit product. Two `u128` factors
/// always fit, so only a quotient above `u128::MAX` overflows.
fn mul_div(x: u128, numerator: u128, denominator: u128, rounding: Rounding) -> Result<u128> {
    if denominator == 0 {
        return Err(VaultError::Overflow);
    }
    let product = U256::from(x)
        .checked_mul(U256::from(numerator))
        .ok_or(VaultError::Overflow)?;
    let (quotient, remainder) = product.div_mod(U256::from(denominator));
    if quotient > U256::from(u128::MAX) {
        return Err(VaultError::Overflow);
    }
    let quotient = quotient.low_u128();
    if rounding == Rounding::Ceil && !remainder.is_zero() {
        return quotient.checked_add(1).ok_or(VaultError::Overflow);
    }
    Ok(quotient)
}

/// A share vault bound to one asset and one operator.
#[derive(Clone, Debug)]
pub struct Embankment {
    address: Address,
    asset: Address,
    operator: Address,
    shares: BTreeMap<Address, u128>,
    total_shares: u128,
}

impl Embankment {
    /// Create a vault at `address` holding `asset`, operated by `operator`.
    pub fn new(address: Address, asset: Address, operator: Address) -> Self {
        Self {
            address,
            asset,
            operator,
            shares: BTreeMap::new(),
            total_shares: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The asset this vault is bound to.
    pub fn asset(&self) -> Address {
        self.asset
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn shares_of(&self, holder: &Address) -> u128 {
        self.shares.get(holder).copied().unwrap_or(0)
    }

    /// Asset units held by the vault.
    pub fn total_assets(&self, ledger: &Token) -> u128 {
        ledger.balance_of(&self.address)
    }

    fn virtual_shares(&self) -> Result<u128> {
        self.total_shares
            .checked_add(VIRTUAL_SHARES)
            .ok_or(VaultError::Overflow)
    }

    fn virtual_assets(&self, ledger: &Token) -> Result<u128> {
        self.total_assets(ledger)
            .checked_add(VIRTUAL_ASSETS)
            .ok_or(VaultError::Overflow)
    }

    pub fn convert_to_shares(&self, ledger: &Token, assets: u128, rounding: Rounding) -> Result<u128> {
        mul_div(
            assets,
            self.virtual_shares()?,
            self.virtual_assets(ledger)?,
            rounding,
        )
    }

    pub fn convert_to_assets(&self, ledger: &Token, shares: u128, rounding: Rounding) -> Result<u128> {
        mul_div(
            shares,
            self.virtual_assets(ledger)?,
            self.virtual_shares()?,
            rounding,
        )
    }

    /// Shares burned to withdraw exactly `assets`.
    pub fn preview_withdraw(&self, ledger: &Token, assets: u128) -> Result<u128> {
        self.convert_to_shares(ledger, assets, Rounding::Ceil)
    }

    /// Current worth of `holder`'s shares, rounded down.
    pub fn redeemable_value(&self, ledger: &Token, holder: &Address) -> Result<u128> {
        self.convert_to_assets(ledger, self.shares_of(holder), Rounding::Floor)
    }

    /// Alias of [`Self::redeemable_value`].
    pub fn max_withdraw(&self, ledger: &Token, holder: &Address) -> Result<u128> {
        self.redeemable_value(ledger, holder)
    }

    fn ensure_operator(&self, caller: Address) -> Result<()> {
        if caller != self.operator {
            return Err(VaultError::Unauthorized(caller));
        }
        Ok(())
    }

    fn ensure_asset(&self, ledger: &Token) -> Result<()> {
        if ledger.address() != self.asset {
            return Err(VaultError::AssetMismatch {
                expected: self.asset,
                actual: ledger.address(),
            });
        }
        Ok(())
    }

    /// Pull `assets` from `caller` (via allowance) and mint shares to `receiver`.
    pub fn deposit(
        &mut self,
        ledger: &mut Token,
        caller: Address,
        assets: u128,
        receiver: Address,
    ) -> Result<u128> {
        self.ensure_operator(caller)?;
        self.ensure_asset(ledger)?;

        let shares = self.convert_to_shares(ledger, assets, Rounding::Floor)?;
        ledger.transfer_from(self.address, caller, self.address, assets)?;
        self.mint(receiver, shares)?;

        tracing::debug!(assets, shares, "embankment: deposit");
        Ok(shares)
    }

    /// Send `assets` to `receiver`, burning `owner`'s shares.
    pub fn withdraw(
        &mut self,
        ledger: &mut Token,
        caller: Address,
        assets: u128,
        receiver: Address,
        owner: Address,
    ) -> Result<u128> {
        self.ensure_operator(caller)?;
        self.ensure_asset(ledger)?;
        if caller != owner {
            return Err(VaultError::Unauthorized(caller));
        }

        let max = self.max_withdraw(ledger, &owner)?;
        if assets > max {
            return Err(VaultError::ExceedsMaxWithdraw {
                requested: assets,
                max,
            });
        }
        let shares = self.preview_withdraw(ledger, assets)?;

        ledger.transfer(self.address, receiver, assets)?;
        self.burn(owner, shares)?;

        tracing::debug!(assets, shares, "embankment: withdraw");
        Ok(shares)
    }

    /// Yield arriving at the vault: a plain transfer into its balance.
    pub fn accrue(&self, ledger: &mut Token, from: Address, amount: u128) -> Result<()> {
        self.ensure_asset(ledger)?;
        ledger.transfer(from, self.address, amount)?;
        tracing::trace!(amount, "embankment: yield accrued");
        Ok(())
    }

    fn mint(&mut self, to: Address, shares: u128) -> Result<()> {
        self.total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(VaultError::Overflow)?;
        *self.shares.entry(to).or_insert(0) += shares;
        Ok(())
    }

    fn burn(&mut self, from: Address, shares: u128) -> Result<()> {
        let balance = self.shares_of(&from);
        if shares > balance {
            return Err(VaultError::ExceedsShares {
                requested: shares,
                balance,
            });
        }
        self.shares.insert(from, balance - shares);
        self.total_shares -= shares;
        Ok(())
    }
}
