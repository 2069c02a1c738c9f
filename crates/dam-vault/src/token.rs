//! Fungible asset ledger.
//!
//! Balances, allowances and owner-signed permits. A permit lets a third
//! party submit an approval on the owner's behalf; the owner signs
//!
//! ```text
//! derive_key("Dam v1 permit", BLAKE3(token || owner || spender || value || nonce || deadline))
//! ```
//!
//! with the Ed25519 key whose public half is the owner address.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use dam_crypto::blake3::{self, contexts};
use dam_crypto::ed25519::{self, SigningKey};
use dam_types::Address;

use crate::AssetError;

type Result<T> = std::result::Result<T, AssetError>;

/// A signed approval.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    pub owner: Address,
    pub spender: Address,
    pub value: u128,
    pub deadline: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

impl Permit {
    /// Sign a permit for `spender` with the owner's key.
    pub fn sign(
        token: Address,
        owner_key: &SigningKey,
        spender: Address,
        value: u128,
        nonce: u64,
        deadline: u64,
    ) -> Self {
        let owner = Address::new(owner_key.verifying_key().to_bytes());
        let digest = permit_digest(token, owner, spender, value, nonce, deadline);
        Self {
            owner,
            spender,
            value,
            deadline,
            signature: owner_key.sign(&digest).to_bytes(),
        }
    }
}

fn permit_digest(
    token: Address,
    owner: Address,
    spender: Address,
    value: u128,
    nonce: u64,
    deadline: u64,
) -> [u8; 32] {
    let encoded = blake3::encode_multi_field(&[
        token.as_bytes(),
        owner.as_bytes(),
        spender.as_bytes(),
        &value.to_le_bytes(),
        &nonce.to_le_bytes(),
        &deadline.to_le_bytes(),
    ]);
    blake3::message_digest(contexts::PERMIT, &encoded)
}

/// In-memory fungible token.
#[derive(Clone, Debug)]
pub struct Token {
    address: Address,
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<(Address, Address), u128>,
    nonces: BTreeMap<Address, u64>,
    rejecting: BTreeSet<Address>,
}

impl Token {
    /// Create an empty ledger identified by `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            nonces: BTreeMap::new(),
            rejecting: BTreeSet::new(),
        }
    }

    /// This ledger's identity.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Next permit nonce for `owner`.
    pub fn nonce(&self, owner: &Address) -> u64 {
        self.nonces.get(owner).copied().unwrap_or(0)
    }

    /// Create new units.
    pub fn mint(&mut self, to: Address, amount: u128) -> Result<()> {
        if to.is_zero() {
            return Err(AssetError::InvalidAddress);
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(AssetError::Overflow)?;
        Ok(())
    }

    /// Make `holder` refuse (or accept again) incoming transfers.
    pub fn reject_incoming(&mut self, holder: Address, reject: bool) {
        if reject {
            self.rejecting.insert(holder);
        } else {
            self.rejecting.remove(&holder);
        }
    }

    /// Move `amount` from `from` (the caller) to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        if from.is_zero() || to.is_zero() {
            return Err(AssetError::InvalidAddress);
        }
        if self.rejecting.contains(&to) {
            return Err(AssetError::TransferRejected(to));
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        self.balances.insert(from, available - amount);
        let to_balance = self.balances.entry(to).or_insert(0);
        *to_balance = to_balance.checked_add(amount).ok_or(AssetError::Overflow)?;
        Ok(())
    }

    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        let allowed = self.allowance(&from, &spender);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance {
                needed: amount,
                available: allowed,
            });
        }
        self.transfer(from, to, amount)?;
        if allowed != u128::MAX {
            self.allowances.insert((from, spender), allowed - amount);
        }
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s balance.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) -> Result<()> {
        if owner.is_zero() || spender.is_zero() {
            return Err(AssetError::InvalidAddress);
        }
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    /// Apply an owner-signed approval.
    pub fn permit(&mut self, permit: &Permit, now: u64) -> Result<()> {
        if now > permit.deadline {
            return Err(AssetError::PermitExpired {
                deadline: permit.deadline,
                now,
            });
        }
        let nonce = self.nonce(&permit.owner);
        let digest = permit_digest(
            self.address,
            permit.owner,
            permit.spender,
            permit.value,
            nonce,
            permit.deadline,
        );
        ed25519::verify_raw(permit.owner.as_bytes(), &digest, &permit.signature)
            .map_err(|_| AssetError::InvalidPermit)?;

        self.nonces.insert(permit.owner, nonce + 1);
        self.approve(permit.owner, permit.spender, permit.value)
    }
}
