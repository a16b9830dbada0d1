//! Capability interfaces of the external collaborators.
//!
//! The factory never knows what a pool endpoint does internally. It only
//! needs the handful of calls below, all of which may fail or misbehave.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Address, CollectionId, PoolEndpointId};
use crate::error::EndpointError;

/// Identifier of a staked item inside a pool endpoint.
pub type ItemId = u128;

/// Four-byte interface identifier used by capability probes.
pub type InterfaceId = [u8; 4];

/// Interface id advertised by non-fungible-asset collections (ERC-721).
pub const NON_FUNGIBLE_INTERFACE_ID: InterfaceId = [0x80, 0xac, 0x58, 0xcd];

/// Capability surface of an independently deployed pool endpoint.
///
/// `caller` is the identity the call is made from (the factory itself).
#[async_trait]
pub trait PoolEndpoint: Send + Sync + fmt::Debug {
    /// Distributes pending rewards.
    async fn claim_rewards(&self, caller: Address) -> Result<(), EndpointError>;

    /// Distributes pending rewards on behalf of `beneficiary`.
    async fn claim_rewards_for(
        &self,
        caller: Address,
        beneficiary: Address,
    ) -> Result<(), EndpointError>;

    /// Force-releases `item_id` to `destination`.
    async fn emergency_unstake(
        &self,
        caller: Address,
        item_id: ItemId,
        destination: Address,
    ) -> Result<(), EndpointError>;

    /// Hands endpoint ownership to `new_owner`.
    async fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), EndpointError>;
}

/// Capability probe of an asset collection.
#[async_trait]
pub trait CollectionContract: Send + Sync + fmt::Debug {
    /// Returns whether the collection implements `interface_id`.
    async fn supports_interface(&self, interface_id: InterfaceId) -> Result<bool, EndpointError>;
}

/// The hosting ledger: code-presence probes, collaborator resolution and
/// outbound value transfer.
#[async_trait]
pub trait Environment: Send + Sync + fmt::Debug {
    /// Returns `true` if an executable component is deployed at `address`.
    fn has_code(&self, address: Address) -> bool;

    /// Resolves a pool endpoint's capability interface.
    fn pool_endpoint(&self, id: PoolEndpointId) -> Option<Arc<dyn PoolEndpoint>>;

    /// Resolves a collection's capability interface.
    fn collection(&self, id: CollectionId) -> Option<Arc<dyn CollectionContract>>;

    /// Sends `amount` from `from` to `to`. The recipient may reject.
    async fn transfer_value(
        &self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), EndpointError>;
}
