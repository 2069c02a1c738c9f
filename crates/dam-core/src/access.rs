//! Two-tier access control.
//!
//! The controller (owner) may call every mutating operation. The oracle may
//! additionally end rounds and rotate its own key.

use serde::{Deserialize, Serialize};

use dam_types::Address;

use crate::{DamError, Result};

/// Role holders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    controller: Address,
}

impl AccessControl {
    pub fn new(controller: Address) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> Address {
        self.controller
    }

    pub fn is_controller(&self, caller: &Address) -> bool {
        !caller.is_zero() && *caller == self.controller
    }

    pub fn is_controller_or_oracle(&self, caller: &Address, oracle_key: &Address) -> bool {
        self.is_controller(caller) || (!caller.is_zero() && caller == oracle_key)
    }

    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless `caller` is the controller
    pub fn ensure_controller(&self, caller: &Address) -> Result<()> {
        if !self.is_controller(caller) {
            return Err(DamError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless `caller` is the controller or the oracle
    pub fn ensure_controller_or_oracle(&self, caller: &Address, oracle_key: &Address) -> Result<()> {
        if !self.is_controller_or_oracle(caller, oracle_key) {
            return Err(DamError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// Hand the controller role to `next`.
    pub fn transfer(&mut self, next: Address) -> Result<Address> {
        if next.is_zero() {
            return Err(DamError::InvalidAddress);
        }
        Ok(std::mem::replace(&mut self.controller, next))
    }
}
