//! Single administrative principal.
//!
//! [`AccessControl`] holds exactly one principal, or the zero sentinel after
//! renouncement. Every privileged entry point starts with
//! [`AccessControl::ensure_owner`].

use super::Address;
use crate::error::FactoryError;

/// Tracks the administrative principal.
///
/// The principal is replaced only through [`AccessControl::transfer`] or
/// cleared through [`AccessControl::renounce`]; there is no implicit change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    owner: Address,
}

impl AccessControl {
    /// Creates a guard owned by `deployer`.
    #[must_use]
    pub const fn new(deployer: Address) -> Self {
        Self { owner: deployer }
    }

    /// Returns the current principal (zero once renounced).
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Fails unless `caller` is the current principal.
    ///
    /// A renounced guard rejects every caller, including the zero address.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Unauthorized`] on mismatch.
    pub fn ensure_owner(&self, caller: Address) -> Result<(), FactoryError> {
        if self.owner.is_zero() || caller != self.owner {
            return Err(FactoryError::Unauthorized(caller));
        }
        Ok(())
    }

    /// Hands the principal role to `new_owner`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Unauthorized`] if `caller` is not the
    /// principal, or [`FactoryError::InvalidArgument`] if `new_owner` is the
    /// zero sentinel. Either way nothing changes.
    pub fn transfer(&mut self, caller: Address, new_owner: Address) -> Result<Address, FactoryError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(FactoryError::InvalidArgument(
                "new owner is the zero address".to_string(),
            ));
        }
        let previous = self.owner;
        self.owner = new_owner;
        Ok(previous)
    }

    /// Clears the principal. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Unauthorized`] if `caller` is not the principal.
    pub fn renounce(&mut self, caller: Address) -> Result<Address, FactoryError> {
        self.ensure_owner(caller)?;
        let previous = self.owner;
        self.owner = Address::ZERO;
        Ok(previous)
    }
}
