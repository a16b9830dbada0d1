//! In-process ledger and collaborator doubles.
//!
//! [`InMemoryEnvironment`] backs the development server and the test
//! suites. [`StaticPoolEndpoint`] records every call it receives and can be
//! switched into a failing mode; [`StaticCollection`] answers capability
//! probes with a fixed result.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use super::traits::{
    CollectionContract, Environment, InterfaceId, ItemId, NON_FUNGIBLE_INTERFACE_ID, PoolEndpoint,
};
use crate::domain::{Address, CollectionId, PoolEndpointId};
use crate::error::EndpointError;

#[derive(Debug, Default)]
struct Ledger {
    code: HashSet<Address>,
    endpoints: HashMap<PoolEndpointId, Arc<dyn PoolEndpoint>>,
    collections: HashMap<CollectionId, Arc<dyn CollectionContract>>,
    balances: HashMap<Address, u128>,
    rejecting: HashSet<Address>,
}

/// Map-backed [`Environment`].
#[derive(Debug, Default)]
pub struct InMemoryEnvironment {
    ledger: RwLock<Ledger>,
}

impl InMemoryEnvironment {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `address` as holding executable code with no known interface.
    pub fn deploy_code(&self, address: Address) {
        self.write().code.insert(address);
    }

    /// Deploys a pool endpoint at `id`.
    pub fn deploy_endpoint(&self, id: PoolEndpointId, endpoint: Arc<dyn PoolEndpoint>) {
        let mut ledger = self.write();
        ledger.code.insert(id.address());
        ledger.endpoints.insert(id, endpoint);
    }

    /// Deploys a collection at `id`.
    pub fn deploy_collection(&self, id: CollectionId, collection: Arc<dyn CollectionContract>) {
        let mut ledger = self.write();
        ledger.code.insert(id.address());
        ledger.collections.insert(id, collection);
    }

    /// Makes every future transfer to `address` fail.
    pub fn reject_transfers_to(&self, address: Address) {
        self.write().rejecting.insert(address);
    }

    /// Returns the value credited to `address` by transfers.
    #[must_use]
    pub fn balance_of(&self, address: Address) -> u128 {
        self.read().balances.get(&address).copied().unwrap_or(0)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Environment for InMemoryEnvironment {
    fn has_code(&self, address: Address) -> bool {
        self.read().code.contains(&address)
    }

    fn pool_endpoint(&self, id: PoolEndpointId) -> Option<Arc<dyn PoolEndpoint>> {
        self.read().endpoints.get(&id).map(Arc::clone)
    }

    fn collection(&self, id: CollectionId) -> Option<Arc<dyn CollectionContract>> {
        self.read().collections.get(&id).map(Arc::clone)
    }

    async fn transfer_value(
        &self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), EndpointError> {
        let mut ledger = self.write();
        if ledger.rejecting.contains(&to) {
            return Err(EndpointError::Reverted(format!(
                "{to} rejected {amount} from {from}"
            )));
        }
        let balance = ledger.balances.entry(to).or_insert(0);
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}

/// A call observed by a [`StaticPoolEndpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointCall {
    /// `claim_rewards`.
    ClaimRewards {
        /// Calling identity.
        caller: Address,
    },
    /// `claim_rewards_for`.
    ClaimRewardsFor {
        /// Calling identity.
        caller: Address,
        /// Reward recipient.
        beneficiary: Address,
    },
    /// `emergency_unstake`.
    EmergencyUnstake {
        /// Calling identity.
        caller: Address,
        /// Released item.
        item_id: ItemId,
        /// Item recipient.
        destination: Address,
    },
    /// `transfer_ownership`.
    TransferOwnership {
        /// Calling identity.
        caller: Address,
        /// New endpoint owner.
        new_owner: Address,
    },
}

/// Recording pool endpoint.
///
/// Every call is recorded, including the ones that fail. Ownership
/// transfer is only accepted from the current owner.
#[derive(Debug)]
pub struct StaticPoolEndpoint {
    owner: Mutex<Address>,
    failing: AtomicBool,
    calls: Mutex<Vec<EndpointCall>>,
}

impl StaticPoolEndpoint {
    /// Creates a healthy endpoint owned by `owner`.
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self {
            owner: Mutex::new(owner),
            failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Builder: make every call revert.
    #[must_use]
    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    /// Toggles the failing mode.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<EndpointCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the current endpoint owner.
    #[must_use]
    pub fn owner(&self) -> Address {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: EndpointCall) -> Result<(), EndpointError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EndpointError::Reverted("endpoint failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PoolEndpoint for StaticPoolEndpoint {
    async fn claim_rewards(&self, caller: Address) -> Result<(), EndpointError> {
        self.record(EndpointCall::ClaimRewards { caller })
    }

    async fn claim_rewards_for(
        &self,
        caller: Address,
        beneficiary: Address,
    ) -> Result<(), EndpointError> {
        self.record(EndpointCall::ClaimRewardsFor {
            caller,
            beneficiary,
        })
    }

    async fn emergency_unstake(
        &self,
        caller: Address,
        item_id: ItemId,
        destination: Address,
    ) -> Result<(), EndpointError> {
        self.record(EndpointCall::EmergencyUnstake {
            caller,
            item_id,
            destination,
        })
    }

    async fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), EndpointError> {
        self.record(EndpointCall::TransferOwnership { caller, new_owner })?;
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        if *owner != caller {
            return Err(EndpointError::Reverted(format!(
                "caller {caller} is not the endpoint owner"
            )));
        }
        *owner = new_owner;
        Ok(())
    }
}

/// How a [`StaticCollection`] answers capability probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeBehavior {
    /// Advertises the non-fungible interface.
    NonFungible,
    /// Answers `false` to every probe.
    Unsupported,
    /// Fails every probe.
    Reverts,
}

/// Collection with a fixed probe answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticCollection {
    behavior: ProbeBehavior,
}

impl StaticCollection {
    /// Creates a collection with the given probe behavior.
    #[must_use]
    pub const fn new(behavior: ProbeBehavior) -> Self {
        Self { behavior }
    }
}

#[async_trait]
impl CollectionContract for StaticCollection {
    async fn supports_interface(&self, interface_id: InterfaceId) -> Result<bool, EndpointError> {
        match self.behavior {
            ProbeBehavior::NonFungible => Ok(interface_id == NON_FUNGIBLE_INTERFACE_ID),
            ProbeBehavior::Unsupported => Ok(false),
            ProbeBehavior::Reverts => Err(EndpointError::Reverted("probe reverted".to_string())),
        }
    }
}
