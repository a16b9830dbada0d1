//! Pool factory: administrative directory management and fault-tolerant
//! batch dispatch.

use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::batch::{BatchReport, TargetOutcome};
use crate::domain::{
    AccessControl, Address, CollectionId, EventBus, FactoryEvent, PoolDirectory, PoolEndpointId,
    PoolInfo, PoolRecord, ReentrancyGuard,
};
use crate::endpoint::{Environment, ItemId, NON_FUNGIBLE_INTERFACE_ID, PoolEndpoint};
use crate::error::{EndpointError, FactoryError};

/// Largest target list accepted by the reward-claim batches.
pub const MAX_CLAIM_BATCH: usize = 20;

/// Largest target list accepted by the emergency unstake batch.
pub const MAX_UNSTAKE_BATCH: usize = 10;

/// Upper bound (inclusive) of the central share percentage.
pub const MAX_CENTRAL_SHARE: u32 = 100;

/// Mutable state guarded by the factory: principal, directory and held
/// balance.
#[derive(Debug, Clone)]
struct FactoryState {
    access: AccessControl,
    directory: PoolDirectory,
    balance: u128,
}

/// Persistable image of the factory state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorySnapshot {
    /// Current principal (zero once renounced).
    pub owner: Address,
    /// Directory records in sequence order.
    pub records: Vec<PoolRecord>,
    /// Held balance (string-encoded u128).
    pub balance: String,
}

/// Parameters of the disabled pool-creation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatePoolParams {
    /// Collection the pool would serve.
    pub collection: CollectionId,
    /// Receipt token the pool would mint.
    pub receipt: Address,
    /// Central pool the pool would forward a share to.
    pub central_pool: Address,
    /// Fee amount charged by the pool.
    pub fee_amount: u128,
    /// Percentage of fees routed to the central pool.
    pub central_share: u32,
}

/// Orchestration layer for every factory operation.
///
/// Owns the guarded state behind a [`RwLock`], the shared
/// [`ReentrancyGuard`], the [`Environment`] used to reach collaborators and
/// the [`EventBus`] for audit events. Every mutation runs in turn through
/// the guard and follows the pattern: authorize → validate → mutate → emit
/// event, with events published under the state write lock. The state lock
/// is never held across a collaborator call, so a callee that calls back in
/// sees [`FactoryError::ReentrantCall`] on guarded entry points instead of a
/// deadlock. Queries only take the state read lock.
#[derive(Debug)]
pub struct PoolFactory {
    state: RwLock<FactoryState>,
    guard: ReentrancyGuard,
    environment: Arc<dyn Environment>,
    event_bus: EventBus,
    address: Address,
    multi_get_limit: Option<usize>,
}

impl PoolFactory {
    /// Creates a factory administered by `deployer`.
    ///
    /// `address` is the factory's own identity, used as the caller of every
    /// collaborator call and as the source of outbound transfers.
    #[must_use]
    pub fn new(
        deployer: Address,
        address: Address,
        environment: Arc<dyn Environment>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: RwLock::new(FactoryState {
                access: AccessControl::new(deployer),
                directory: PoolDirectory::new(),
                balance: 0,
            }),
            guard: ReentrancyGuard::new(),
            environment,
            event_bus,
            address,
            multi_get_limit: None,
        }
    }

    /// Caps the input length of [`PoolFactory::multiple_pool_infos`].
    #[must_use]
    pub fn with_multi_get_limit(mut self, limit: Option<usize>) -> Self {
        self.multi_get_limit = limit;
        self
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns the factory's own identity.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    // ── Access control ──────────────────────────────────────────────────

    /// Returns the current principal.
    pub async fn owner(&self) -> Address {
        self.state.read().await.access.owner()
    }

    /// Hands the principal role to `new_owner`.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`] if `caller` is not the principal,
    /// [`FactoryError::InvalidArgument`] if `new_owner` is zero.
    pub async fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), FactoryError> {
        self.guard
            .ordered(async {
                let mut state = self.state.write().await;
                let previous_owner = state
                    .access
                    .transfer(caller, new_owner)
                    .inspect_err(|e| reject("transfer_ownership", caller, e))?;
                self.event_bus.publish(FactoryEvent::OwnershipTransferred {
                    previous_owner,
                    new_owner,
                });
                tracing::info!(%previous_owner, %new_owner, "ownership transferred");
                Ok(())
            })
            .await
    }

    /// Clears the principal. No administrative call can succeed afterwards.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`] if `caller` is not the principal.
    pub async fn renounce_ownership(&self, caller: Address) -> Result<(), FactoryError> {
        self.guard
            .ordered(async {
                let mut state = self.state.write().await;
                let previous_owner = state
                    .access
                    .renounce(caller)
                    .inspect_err(|e| reject("renounce_ownership", caller, e))?;
                self.event_bus.publish(FactoryEvent::OwnershipTransferred {
                    previous_owner,
                    new_owner: Address::ZERO,
                });
                tracing::warn!(%previous_owner, "ownership renounced");
                Ok(())
            })
            .await
    }

    // ── Directory mutations ─────────────────────────────────────────────

    /// Registers `pool` as the endpoint for `collection`.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`], [`FactoryError::InvalidArgument`] on a
    /// zero id, [`FactoryError::AlreadyExists`] if the collection is mapped,
    /// [`FactoryError::InvalidEndpoint`] if no code is deployed at `pool`.
    pub async fn register_pool(
        &self,
        caller: Address,
        collection: CollectionId,
        pool: PoolEndpointId,
    ) -> Result<(), FactoryError> {
        self.guard
            .ordered(async {
                let mut state = self.state.write().await;
                state
                    .access
                    .ensure_owner(caller)
                    .inspect_err(|e| reject("register_pool", caller, e))?;
                if collection.is_zero() || pool.is_zero() {
                    return Err(FactoryError::InvalidArgument(
                        "collection and pool must be non-zero".to_string(),
                    ));
                }
                if state.directory.contains(collection) {
                    return Err(FactoryError::AlreadyExists(collection));
                }
                if !self.environment.has_code(pool.address()) {
                    return Err(FactoryError::InvalidEndpoint(pool));
                }
                state
                    .directory
                    .insert(PoolRecord::new(collection, pool))?;
                self.event_bus
                    .publish(FactoryEvent::PoolRegistered { collection, pool });
                tracing::info!(%collection, %pool, count = state.directory.len(), "pool registered");
                Ok(())
            })
            .await
    }

    /// Removes the record of `collection`.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`], or [`FactoryError::NotFound`] if the
    /// collection is unmapped.
    pub async fn remove_pool(
        &self,
        caller: Address,
        collection: CollectionId,
    ) -> Result<(), FactoryError> {
        self.guard
            .ordered(async {
                let mut state = self.state.write().await;
                state
                    .access
                    .ensure_owner(caller)
                    .inspect_err(|e| reject("remove_pool", caller, e))?;
                let removed = state.directory.remove(collection)?;
                self.event_bus.publish(FactoryEvent::PoolRemoved {
                    collection,
                    pool: removed.pool,
                });
                tracing::info!(%collection, pool = %removed.pool, count = state.directory.len(), "pool removed");
                Ok(())
            })
            .await
    }

    /// Hands ownership of the endpoint registered for `collection` to
    /// `new_owner`.
    ///
    /// Single-target administrative call: unlike the batches, a failing
    /// endpoint fails the whole call.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`], [`FactoryError::ReentrantCall`],
    /// [`FactoryError::InvalidArgument`] on a zero owner,
    /// [`FactoryError::NotFound`], [`FactoryError::InvalidEndpoint`] if the
    /// endpoint cannot be resolved, [`FactoryError::TransferFailed`] if the
    /// endpoint rejects the transfer.
    pub async fn transfer_pool_ownership(
        &self,
        caller: Address,
        collection: CollectionId,
        new_owner: Address,
    ) -> Result<(), FactoryError> {
        self.guard
            .guarded(async {
                self.authorize("transfer_pool_ownership", caller).await?;
                if new_owner.is_zero() {
                    return Err(FactoryError::InvalidArgument(
                        "new owner is the zero address".to_string(),
                    ));
                }
                let pool = self
                    .state
                    .read()
                    .await
                    .directory
                    .get(collection)
                    .ok_or(FactoryError::NotFound(collection))?;
                let endpoint = self
                    .environment
                    .pool_endpoint(pool)
                    .ok_or(FactoryError::InvalidEndpoint(pool))?;
                endpoint
                    .transfer_ownership(self.address, new_owner)
                    .await
                    .map_err(|e| FactoryError::TransferFailed(e.to_string()))?;
                self.event_bus.publish(FactoryEvent::PoolOwnershipTransferred {
                    collection,
                    pool,
                    new_owner,
                });
                tracing::info!(%collection, %pool, %new_owner, "pool ownership transferred");
                Ok(())
            })
            .await
    }

    // ── Directory queries ───────────────────────────────────────────────

    /// Returns the endpoint mapped to `collection`, or the zero id.
    pub async fn pool_for_collection(&self, collection: CollectionId) -> PoolEndpointId {
        self.state
            .read()
            .await
            .directory
            .get(collection)
            .unwrap_or(PoolEndpointId::ZERO)
    }

    /// Returns every registered endpoint. Order is unstable across removals.
    pub async fn all_pools(&self) -> Vec<PoolEndpointId> {
        self.state.read().await.directory.pools()
    }

    /// Returns the endpoints at positions `start..end`.
    ///
    /// # Errors
    ///
    /// [`FactoryError::InvalidArgument`] if `start >= end` or `end` exceeds
    /// the number of pools.
    pub async fn pools_in_range(
        &self,
        start: usize,
        end: usize,
    ) -> Result<Vec<PoolEndpointId>, FactoryError> {
        self.state.read().await.directory.range(start, end)
    }

    /// Looks up one collection.
    pub async fn pool_info(&self, collection: CollectionId) -> PoolInfo {
        self.state.read().await.directory.info(collection)
    }

    /// Looks up many collections; output is parallel to the input.
    ///
    /// # Errors
    ///
    /// [`FactoryError::InvalidArgument`] only when a multi-get limit is
    /// configured and exceeded.
    pub async fn multiple_pool_infos(
        &self,
        collections: &[CollectionId],
    ) -> Result<Vec<PoolInfo>, FactoryError> {
        if let Some(limit) = self.multi_get_limit
            && collections.len() > limit
        {
            return Err(FactoryError::InvalidArgument(format!(
                "{} collections requested, limit is {limit}",
                collections.len()
            )));
        }
        Ok(self.state.read().await.directory.infos(collections))
    }

    /// Returns `true` if `collection` has a registered pool.
    pub async fn pool_exists(&self, collection: CollectionId) -> bool {
        self.state.read().await.directory.contains(collection)
    }

    /// Returns the number of registered pools.
    pub async fn count(&self) -> usize {
        self.state.read().await.directory.len()
    }

    // ── Batch fan-out ───────────────────────────────────────────────────

    /// Triggers reward distribution on every target. Open to any caller.
    ///
    /// # Errors
    ///
    /// [`FactoryError::ReentrantCall`], or [`FactoryError::InvalidArgument`]
    /// unless `1 <= targets.len() <= MAX_CLAIM_BATCH`. Target failures never
    /// fail the call.
    pub async fn batch_claim_rewards(
        &self,
        targets: &[PoolEndpointId],
    ) -> Result<BatchReport, FactoryError> {
        self.guard
            .guarded(async {
                check_claim_batch(targets)?;
                let caller = self.address;
                let report = self
                    .fan_out(
                        "claim_rewards",
                        targets.iter().map(|&t| (t, ())),
                        |endpoint, ()| async move { endpoint.claim_rewards(caller).await },
                    )
                    .await;
                Ok(report)
            })
            .await
    }

    /// Triggers reward distribution on behalf of `beneficiary` on every
    /// target. Open to any caller.
    ///
    /// # Errors
    ///
    /// Same as [`PoolFactory::batch_claim_rewards`].
    pub async fn batch_claim_rewards_for(
        &self,
        targets: &[PoolEndpointId],
        beneficiary: Address,
    ) -> Result<BatchReport, FactoryError> {
        self.guard
            .guarded(async {
                check_claim_batch(targets)?;
                let caller = self.address;
                let report = self
                    .fan_out(
                        "claim_rewards_for",
                        targets.iter().map(|&t| (t, ())),
                        |endpoint, ()| async move {
                            endpoint.claim_rewards_for(caller, beneficiary).await
                        },
                    )
                    .await;
                Ok(report)
            })
            .await
    }

    /// Force-releases `item_ids[i]` from `targets[i]` to the principal.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`], [`FactoryError::ReentrantCall`], or
    /// [`FactoryError::InvalidArgument`] on a length mismatch or more than
    /// [`MAX_UNSTAKE_BATCH`] entries.
    pub async fn emergency_batch_unstake(
        &self,
        caller: Address,
        targets: &[PoolEndpointId],
        item_ids: &[ItemId],
    ) -> Result<BatchReport, FactoryError> {
        self.guard
            .guarded(async {
                let owner = self.authorize("emergency_batch_unstake", caller).await?;
                if targets.len() != item_ids.len() {
                    return Err(FactoryError::InvalidArgument(format!(
                        "{} targets but {} item ids",
                        targets.len(),
                        item_ids.len()
                    )));
                }
                if targets.len() > MAX_UNSTAKE_BATCH {
                    return Err(FactoryError::InvalidArgument(format!(
                        "batch of {} exceeds limit {MAX_UNSTAKE_BATCH}",
                        targets.len()
                    )));
                }
                let factory = self.address;
                let report = self
                    .fan_out(
                        "emergency_unstake",
                        targets.iter().copied().zip(item_ids.iter().copied()),
                        |endpoint, item_id| async move {
                            endpoint.emergency_unstake(factory, item_id, owner).await
                        },
                    )
                    .await;
                Ok(report)
            })
            .await
    }

    /// Invokes `call` on every target in order, isolating failures.
    ///
    /// Unresolvable targets, returned errors and panics inside the callee
    /// are all recorded as [`TargetOutcome::Failed`] and skipped.
    async fn fan_out<A, I, F, Fut>(&self, operation: &'static str, targets: I, call: F) -> BatchReport
    where
        I: ExactSizeIterator<Item = (PoolEndpointId, A)>,
        F: Fn(Arc<dyn PoolEndpoint>, A) -> Fut,
        Fut: Future<Output = Result<(), EndpointError>>,
    {
        let mut report = BatchReport::new(operation, targets.len());
        for (target, arg) in targets {
            let outcome = match self.environment.pool_endpoint(target) {
                None if self.environment.has_code(target.address()) => {
                    TargetOutcome::Failed(EndpointError::Unresolvable(target.address()))
                }
                None => TargetOutcome::Failed(EndpointError::NoCode(target.address())),
                Some(endpoint) => match AssertUnwindSafe(call(endpoint, arg)).catch_unwind().await {
                    Ok(Ok(())) => TargetOutcome::Succeeded,
                    Ok(Err(e)) => TargetOutcome::Failed(e),
                    Err(_) => TargetOutcome::Failed(EndpointError::Reverted(
                        "endpoint panicked".to_string(),
                    )),
                },
            };
            if let TargetOutcome::Failed(ref e) = outcome {
                tracing::warn!(operation, %target, error = %e, "target call failed; continuing");
            }
            report.record(target, outcome);
        }
        tracing::info!(
            operation,
            attempted = report.attempted(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch dispatched"
        );
        report
    }

    // ── Creation validator ──────────────────────────────────────────────

    /// Validates pool-creation parameters, then refuses.
    ///
    /// Pool endpoints are deployed out-of-band and registered through
    /// [`PoolFactory::register_pool`]; this path never creates anything.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`], [`FactoryError::InvalidArgument`],
    /// [`FactoryError::AlreadyExists`], [`FactoryError::InvalidShareRange`],
    /// [`FactoryError::InvalidCollection`] on the first failed check;
    /// otherwise always [`FactoryError::NotImplemented`].
    pub async fn create_pool(
        &self,
        caller: Address,
        params: CreatePoolParams,
    ) -> Result<Infallible, FactoryError> {
        {
            let state = self.state.read().await;
            state
                .access
                .ensure_owner(caller)
                .inspect_err(|e| reject("create_pool", caller, e))?;
            if params.collection.is_zero()
                || params.receipt.is_zero()
                || params.central_pool.is_zero()
            {
                return Err(FactoryError::InvalidArgument(
                    "collection, receipt and central pool must be non-zero".to_string(),
                ));
            }
            if state.directory.contains(params.collection) {
                return Err(FactoryError::AlreadyExists(params.collection));
            }
        }
        if params.central_share > MAX_CENTRAL_SHARE {
            return Err(FactoryError::InvalidShareRange(params.central_share));
        }
        self.probe_collection(params.collection).await?;

        tracing::info!(
            collection = %params.collection,
            fee_amount = %params.fee_amount,
            central_share = params.central_share,
            "pool creation validated; refusing"
        );
        Err(FactoryError::NotImplemented(
            "deploy the pool endpoint separately and register it with register_pool".to_string(),
        ))
    }

    async fn probe_collection(&self, collection: CollectionId) -> Result<(), FactoryError> {
        if !self.environment.has_code(collection.address()) {
            return Err(FactoryError::InvalidCollection(collection));
        }
        let contract = self
            .environment
            .collection(collection)
            .ok_or(FactoryError::InvalidCollection(collection))?;
        let supported = AssertUnwindSafe(contract.supports_interface(NON_FUNGIBLE_INTERFACE_ID))
            .catch_unwind()
            .await;
        match supported {
            Ok(Ok(true)) => Ok(()),
            _ => Err(FactoryError::InvalidCollection(collection)),
        }
    }

    // ── Funds ───────────────────────────────────────────────────────────

    /// Accepts unsolicited incoming value.
    ///
    /// # Errors
    ///
    /// [`FactoryError::InvalidArgument`] if the balance would overflow.
    pub async fn receive(&self, sender: Address, amount: u128) -> Result<u128, FactoryError> {
        self.guard
            .ordered(async {
                let mut state = self.state.write().await;
                let balance = state
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| FactoryError::InvalidArgument("balance overflow".to_string()))?;
                state.balance = balance;
                self.event_bus.publish(FactoryEvent::FundsReceived {
                    sender,
                    amount: amount.to_string(),
                });
                tracing::debug!(%sender, amount = %amount, balance = %balance, "funds received");
                Ok(balance)
            })
            .await
    }

    /// Returns the held balance.
    pub async fn balance(&self) -> u128 {
        self.state.read().await.balance
    }

    /// Sweeps `amount` (or the whole balance when `amount == 0`) to
    /// `destination`. Returns the amount sent.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Unauthorized`], [`FactoryError::ReentrantCall`],
    /// [`FactoryError::InvalidArgument`] on a zero destination,
    /// [`FactoryError::InsufficientFunds`] if the balance is zero or below
    /// `amount`, [`FactoryError::TransferFailed`] if the destination rejects.
    /// The balance is unchanged on every error.
    pub async fn emergency_withdraw(
        &self,
        caller: Address,
        destination: Address,
        amount: u128,
    ) -> Result<u128, FactoryError> {
        self.guard
            .guarded(async {
                self.authorize("emergency_withdraw", caller).await?;
                if destination.is_zero() {
                    return Err(FactoryError::InvalidArgument(
                        "destination is the zero address".to_string(),
                    ));
                }

                let sent = {
                    let mut state = self.state.write().await;
                    let available = state.balance;
                    if available == 0 || amount > available {
                        return Err(FactoryError::InsufficientFunds {
                            requested: amount,
                            available,
                        });
                    }
                    let sent = if amount == 0 { available } else { amount };
                    state.balance = available - sent;
                    sent
                };

                let transfer = self
                    .environment
                    .transfer_value(self.address, destination, sent)
                    .await;
                let mut state = self.state.write().await;
                if let Err(e) = transfer {
                    state.balance = state.balance.saturating_add(sent);
                    tracing::warn!(%destination, amount = %sent, error = %e, "withdrawal rejected");
                    return Err(FactoryError::TransferFailed(e.to_string()));
                }
                self.event_bus.publish(FactoryEvent::FundsWithdrawn {
                    destination,
                    amount: sent.to_string(),
                });
                tracing::info!(%destination, amount = %sent, balance = %state.balance, "emergency withdrawal");
                Ok(sent)
            })
            .await
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    /// Captures the persistable state.
    pub async fn snapshot(&self) -> FactorySnapshot {
        self.checkpoint().await.0
    }

    /// Captures the persistable state together with the sequence number of
    /// the last audit event it reflects.
    pub async fn checkpoint(&self) -> (FactorySnapshot, u64) {
        let state = self.state.read().await;
        let snapshot = FactorySnapshot {
            owner: state.access.owner(),
            records: state.directory.records().to_vec(),
            balance: state.balance.to_string(),
        };
        (snapshot, self.event_bus.last_sequence())
    }

    /// Replaces the state with a previously captured snapshot and resumes
    /// the audit stream after `last_sequence`. Emits no events.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Persistence`] if the snapshot is inconsistent.
    pub async fn restore(
        &self,
        snapshot: FactorySnapshot,
        last_sequence: u64,
    ) -> Result<(), FactoryError> {
        let directory = PoolDirectory::from_records(snapshot.records)
            .map_err(|e| FactoryError::Persistence(format!("corrupt snapshot: {e}")))?;
        let balance = snapshot
            .balance
            .parse::<u128>()
            .map_err(|e| FactoryError::Persistence(format!("corrupt snapshot balance: {e}")))?;
        self.guard
            .ordered(async {
                let mut state = self.state.write().await;
                *state = FactoryState {
                    access: AccessControl::new(snapshot.owner),
                    directory,
                    balance,
                };
                self.event_bus.resume_from(last_sequence);
                tracing::info!(
                    count = state.directory.len(),
                    owner = %snapshot.owner,
                    last_sequence,
                    "state restored"
                );
                Ok(())
            })
            .await
    }

    /// Checks `caller` against the principal and returns the principal.
    async fn authorize(&self, operation: &'static str, caller: Address) -> Result<Address, FactoryError> {
        let state = self.state.read().await;
        state
            .access
            .ensure_owner(caller)
            .inspect_err(|e| reject(operation, caller, e))?;
        Ok(state.access.owner())
    }
}

fn check_claim_batch(targets: &[PoolEndpointId]) -> Result<(), FactoryError> {
    if targets.is_empty() || targets.len() > MAX_CLAIM_BATCH {
        return Err(FactoryError::InvalidArgument(format!(
            "batch size {} outside 1..={MAX_CLAIM_BATCH}",
            targets.len()
        )));
    }
    Ok(())
}

fn reject(operation: &'static str, caller: Address, error: &FactoryError) {
    tracing::warn!(operation, %caller, %error, "administrative call rejected");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::{Mutex, OnceLock, Weak};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::endpoint::{InMemoryEnvironment, ProbeBehavior, StaticCollection, StaticPoolEndpoint};

    const FACTORY: u8 = 0xfa;

    fn admin() -> Address {
        Address::from_low_byte(1)
    }

    fn stranger() -> Address {
        Address::from_low_byte(2)
    }

    fn collection(n: u8) -> CollectionId {
        CollectionId::new(Address::from_low_byte(n))
    }

    fn pool_id(n: u8) -> PoolEndpointId {
        PoolEndpointId::new(Address::from_low_byte(n))
    }

    struct Fixture {
        factory: Arc<PoolFactory>,
        env: Arc<InMemoryEnvironment>,
    }

    impl Fixture {
        fn new() -> Self {
            let env = Arc::new(InMemoryEnvironment::new());
            let dyn_env: Arc<dyn Environment> = Arc::clone(&env) as Arc<dyn Environment>;
            let factory = PoolFactory::new(
                admin(),
                Address::from_low_byte(FACTORY),
                dyn_env,
                EventBus::new(1000),
            );
            Self {
                factory: Arc::new(factory),
                env,
            }
        }

        fn deploy(&self, n: u8) -> Arc<StaticPoolEndpoint> {
            let endpoint = Arc::new(StaticPoolEndpoint::new(Address::from_low_byte(FACTORY)));
            let as_dyn: Arc<dyn PoolEndpoint> = Arc::clone(&endpoint) as Arc<dyn PoolEndpoint>;
            self.env.deploy_endpoint(pool_id(n), as_dyn);
            endpoint
        }

        async fn register(&self, c: u8, p: u8) {
            let Ok(()) = self
                .factory
                .register_pool(admin(), collection(c), pool_id(p))
                .await
            else {
                panic!("registration failed");
            };
        }
    }

    fn create_params(c: u8, share: u32) -> CreatePoolParams {
        CreatePoolParams {
            collection: collection(c),
            receipt: Address::from_low_byte(0x70),
            central_pool: Address::from_low_byte(0x71),
            fee_amount: 1_000,
            central_share: share,
        }
    }

    /// Endpoint that calls back into the factory while being dispatched to.
    #[derive(Debug, Default)]
    struct ReentrantEndpoint {
        factory: OnceLock<Weak<PoolFactory>>,
        observed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PoolEndpoint for ReentrantEndpoint {
        async fn claim_rewards(&self, _caller: Address) -> Result<(), EndpointError> {
            let Some(factory) = self.factory.get().and_then(Weak::upgrade) else {
                return Err(EndpointError::Reverted("factory gone".to_string()));
            };
            let again = factory.batch_claim_rewards(&[pool_id(9)]).await;
            let withdraw = factory.emergency_withdraw(admin(), admin(), 0).await;
            let reads = factory.count().await;
            let mut observed = self.observed.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            observed.push(format!("{:?}", again.err()));
            observed.push(format!("{:?}", withdraw.err()));
            observed.push(format!("count={reads}"));
            Ok(())
        }

        async fn claim_rewards_for(&self, _: Address, _: Address) -> Result<(), EndpointError> {
            Ok(())
        }

        async fn emergency_unstake(
            &self,
            _: Address,
            _: ItemId,
            _: Address,
        ) -> Result<(), EndpointError> {
            Ok(())
        }

        async fn transfer_ownership(&self, _: Address, _: Address) -> Result<(), EndpointError> {
            Ok(())
        }
    }

    /// Endpoint that parks inside `claim_rewards` until released.
    #[derive(Debug, Default)]
    struct SlowEndpoint {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PoolEndpoint for SlowEndpoint {
        async fn claim_rewards(&self, _: Address) -> Result<(), EndpointError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }

        async fn claim_rewards_for(&self, _: Address, _: Address) -> Result<(), EndpointError> {
            Ok(())
        }

        async fn emergency_unstake(
            &self,
            _: Address,
            _: ItemId,
            _: Address,
        ) -> Result<(), EndpointError> {
            Ok(())
        }

        async fn transfer_ownership(&self, _: Address, _: Address) -> Result<(), EndpointError> {
            Ok(())
        }
    }

    /// Endpoint whose calls panic.
    #[derive(Debug)]
    struct PanickingEndpoint;

    #[async_trait]
    impl PoolEndpoint for PanickingEndpoint {
        async fn claim_rewards(&self, _: Address) -> Result<(), EndpointError> {
            panic!("endpoint bug");
        }

        async fn claim_rewards_for(&self, _: Address, _: Address) -> Result<(), EndpointError> {
            panic!("endpoint bug");
        }

        async fn emergency_unstake(
            &self,
            _: Address,
            _: ItemId,
            _: Address,
        ) -> Result<(), EndpointError> {
            panic!("endpoint bug");
        }

        async fn transfer_ownership(&self, _: Address, _: Address) -> Result<(), EndpointError> {
            panic!("endpoint bug");
        }
    }

    // ── Access control ──────────────────────────────────────────────────

    #[tokio::test]
    async fn deployer_is_initial_owner() {
        let fx = Fixture::new();
        assert_eq!(fx.factory.owner().await, admin());
    }

    #[tokio::test]
    async fn transfer_ownership_moves_admin_rights() {
        let fx = Fixture::new();
        fx.deploy(50);
        let new_admin = Address::from_low_byte(3);
        assert!(fx.factory.transfer_ownership(admin(), new_admin).await.is_ok());
        assert_eq!(fx.factory.owner().await, new_admin);

        let old = fx.factory.register_pool(admin(), collection(10), pool_id(50)).await;
        assert!(matches!(old, Err(FactoryError::Unauthorized(_))));
        let new = fx.factory.register_pool(new_admin, collection(10), pool_id(50)).await;
        assert!(new.is_ok());
    }

    #[tokio::test]
    async fn rejected_transfer_leaves_owner_unchanged() {
        let fx = Fixture::new();
        let by_stranger = fx.factory.transfer_ownership(stranger(), stranger()).await;
        assert!(matches!(by_stranger, Err(FactoryError::Unauthorized(_))));
        let to_zero = fx.factory.transfer_ownership(admin(), Address::ZERO).await;
        assert!(matches!(to_zero, Err(FactoryError::InvalidArgument(_))));
        assert_eq!(fx.factory.owner().await, admin());
        assert_eq!(fx.factory.event_bus().last_sequence(), 0);
    }

    #[tokio::test]
    async fn renounce_disables_admin_surface() {
        let fx = Fixture::new();
        fx.deploy(50);
        assert!(fx.factory.renounce_ownership(admin()).await.is_ok());
        assert!(fx.factory.owner().await.is_zero());
        let result = fx.factory.register_pool(admin(), collection(10), pool_id(50)).await;
        assert!(matches!(result, Err(FactoryError::Unauthorized(_))));
        let zero = fx.factory.register_pool(Address::ZERO, collection(10), pool_id(50)).await;
        assert!(matches!(zero, Err(FactoryError::Unauthorized(_))));
    }

    // ── Directory ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn register_round_trip() {
        let fx = Fixture::new();
        fx.deploy(50);
        let before = fx.factory.count().await;
        fx.register(10, 50).await;
        assert_eq!(fx.factory.pool_for_collection(collection(10)).await, pool_id(50));
        assert!(fx.factory.pool_exists(collection(10)).await);
        assert_eq!(fx.factory.count().await, before + 1);
        assert_eq!(
            fx.factory.pool_info(collection(10)).await,
            PoolInfo {
                pool: pool_id(50),
                exists: true
            }
        );
    }

    #[tokio::test]
    async fn register_emits_event() {
        let fx = Fixture::new();
        fx.deploy(50);
        let mut rx = fx.factory.event_bus().subscribe();
        fx.register(10, 50).await;
        let Ok(audit) = rx.recv().await else {
            panic!("expected event");
        };
        assert_eq!(audit.event.event_type_str(), "pool_registered");
        assert_eq!(audit.event.collection(), Some(collection(10)));
    }

    #[tokio::test]
    async fn register_validation_failures_are_no_ops() {
        let fx = Fixture::new();
        fx.deploy(50);
        fx.register(10, 50).await;
        let before = fx.factory.snapshot().await;
        let sequence = fx.factory.event_bus().last_sequence();

        let zero_c = fx.factory.register_pool(admin(), CollectionId::ZERO, pool_id(50)).await;
        assert!(matches!(zero_c, Err(FactoryError::InvalidArgument(_))));
        let zero_p = fx.factory.register_pool(admin(), collection(11), PoolEndpointId::ZERO).await;
        assert!(matches!(zero_p, Err(FactoryError::InvalidArgument(_))));
        let dup = fx.factory.register_pool(admin(), collection(10), pool_id(50)).await;
        assert!(matches!(dup, Err(FactoryError::AlreadyExists(_))));
        let no_code = fx.factory.register_pool(admin(), collection(11), pool_id(77)).await;
        assert!(matches!(no_code, Err(FactoryError::InvalidEndpoint(_))));
        let unauthorized = fx.factory.register_pool(stranger(), collection(11), pool_id(50)).await;
        assert!(matches!(unauthorized, Err(FactoryError::Unauthorized(_))));
        let missing = fx.factory.remove_pool(admin(), collection(99)).await;
        assert!(matches!(missing, Err(FactoryError::NotFound(_))));
        let remove_unauthorized = fx.factory.remove_pool(stranger(), collection(10)).await;
        assert!(matches!(remove_unauthorized, Err(FactoryError::Unauthorized(_))));

        assert_eq!(fx.factory.snapshot().await, before);
        assert_eq!(fx.factory.event_bus().last_sequence(), sequence);
    }

    #[tokio::test]
    async fn code_without_interface_is_a_valid_endpoint() {
        let fx = Fixture::new();
        fx.env.deploy_code(Address::from_low_byte(60));
        let result = fx.factory.register_pool(admin(), collection(10), pool_id(60)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn remove_updates_count_and_multiset() {
        let fx = Fixture::new();
        for n in 0..5u8 {
            fx.deploy(50 + n);
            fx.register(10 + n, 50 + n).await;
        }
        let mut expected = fx.factory.all_pools().await;
        expected.retain(|p| *p != pool_id(51));

        assert!(fx.factory.remove_pool(admin(), collection(11)).await.is_ok());
        assert!(!fx.factory.pool_exists(collection(11)).await);
        assert_eq!(fx.factory.count().await, 4);
        assert_eq!(fx.factory.pool_for_collection(collection(11)).await, PoolEndpointId::ZERO);

        let mut remaining = fx.factory.all_pools().await;
        remaining.sort();
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[tokio::test]
    async fn range_queries_on_five_pools() {
        let fx = Fixture::new();
        for n in 0..5u8 {
            fx.deploy(50 + n);
            fx.register(10 + n, 50 + n).await;
        }
        let Ok(slice) = fx.factory.pools_in_range(1, 3).await else {
            panic!("range failed");
        };
        assert_eq!(slice, vec![pool_id(51), pool_id(52)]);
        assert!(matches!(
            fx.factory.pools_in_range(3, 3).await,
            Err(FactoryError::InvalidArgument(_))
        ));
        assert!(matches!(
            fx.factory.pools_in_range(0, 6).await,
            Err(FactoryError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn multi_get_is_parallel_and_optionally_bounded() {
        let fx = Fixture::new();
        fx.deploy(50);
        fx.register(10, 50).await;
        let Ok(infos) = fx
            .factory
            .multiple_pool_infos(&[collection(10), collection(11)])
            .await
        else {
            panic!("multi-get failed");
        };
        assert_eq!(infos.len(), 2);
        assert_eq!(infos.first().map(|i| i.exists), Some(true));
        assert_eq!(infos.get(1), Some(&PoolInfo::ABSENT));

        let many: Vec<CollectionId> = (0..=255u8).map(collection).collect();
        assert!(fx.factory.multiple_pool_infos(&many).await.is_ok());

        let env: Arc<dyn Environment> = Arc::new(InMemoryEnvironment::new());
        let bounded = PoolFactory::new(admin(), Address::from_low_byte(FACTORY), env, EventBus::new(10))
            .with_multi_get_limit(Some(2));
        assert!(matches!(
            bounded.multiple_pool_infos(&many).await,
            Err(FactoryError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let fx = Fixture::new();
        fx.deploy(50);
        fx.deploy(51);
        fx.deploy(52);
        fx.register(10, 50).await;
        let dup = fx.factory.register_pool(admin(), collection(10), pool_id(51)).await;
        assert!(matches!(dup, Err(FactoryError::AlreadyExists(_))));
        let outsider = fx.factory.register_pool(stranger(), collection(11), pool_id(52)).await;
        assert!(matches!(outsider, Err(FactoryError::Unauthorized(_))));
        assert!(fx.factory.remove_pool(admin(), collection(10)).await.is_ok());
        assert!(!fx.factory.pool_exists(collection(10)).await);
    }

    // ── Batch dispatch ──────────────────────────────────────────────────

    #[tokio::test]
    async fn claim_batch_tolerates_failing_target() {
        let fx = Fixture::new();
        let a = fx.deploy(50);
        let b = fx.deploy(51);
        b.set_failing(true);
        let c = fx.deploy(52);

        let result = fx
            .factory
            .batch_claim_rewards(&[pool_id(50), pool_id(51), pool_id(52)])
            .await;
        let Ok(report) = result else {
            panic!("batch must succeed");
        };
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 1);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes.get(1),
            Some((_, TargetOutcome::Failed(EndpointError::Reverted(_))))
        ));
    }

    #[tokio::test]
    async fn claim_batch_accepts_unregistered_and_missing_targets() {
        let fx = Fixture::new();
        let a = fx.deploy(50);
        let Ok(report) = fx
            .factory
            .batch_claim_rewards(&[pool_id(99), PoolEndpointId::ZERO, pool_id(50)])
            .await
        else {
            panic!("batch must succeed");
        };
        assert_eq!(report.failed(), 2);
        assert_eq!(a.calls(), vec![crate::endpoint::EndpointCall::ClaimRewards {
            caller: Address::from_low_byte(FACTORY)
        }]);
    }

    #[tokio::test]
    async fn claim_batch_survives_panicking_target() {
        let fx = Fixture::new();
        fx.env.deploy_endpoint(pool_id(40), Arc::new(PanickingEndpoint));
        let after = fx.deploy(50);
        let Ok(report) = fx.factory.batch_claim_rewards(&[pool_id(40), pool_id(50)]).await else {
            panic!("batch must succeed");
        };
        assert_eq!(report.failed(), 1);
        assert_eq!(after.call_count(), 1);
        assert!(fx.factory.batch_claim_rewards(&[pool_id(50)]).await.is_ok());
    }

    #[tokio::test]
    async fn claim_batch_size_limits() {
        let fx = Fixture::new();
        let empty = fx.factory.batch_claim_rewards(&[]).await;
        assert!(matches!(empty, Err(FactoryError::InvalidArgument(_))));
        let max: Vec<PoolEndpointId> = (1..=20u8).map(pool_id).collect();
        assert!(fx.factory.batch_claim_rewards(&max).await.is_ok());
        let over: Vec<PoolEndpointId> = (1..=21u8).map(pool_id).collect();
        let result = fx.factory.batch_claim_rewards_for(&over, stranger()).await;
        assert!(matches!(result, Err(FactoryError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn claim_for_forwards_beneficiary() {
        let fx = Fixture::new();
        let a = fx.deploy(50);
        let beneficiary = Address::from_low_byte(0x33);
        assert!(fx.factory.batch_claim_rewards_for(&[pool_id(50)], beneficiary).await.is_ok());
        assert_eq!(a.calls(), vec![crate::endpoint::EndpointCall::ClaimRewardsFor {
            caller: Address::from_low_byte(FACTORY),
            beneficiary,
        }]);
    }

    #[tokio::test]
    async fn emergency_unstake_sends_items_to_owner() {
        let fx = Fixture::new();
        let a = fx.deploy(50);
        fx.deploy(51).set_failing(true);
        let Ok(report) = fx
            .factory
            .emergency_batch_unstake(admin(), &[pool_id(50), pool_id(51)], &[7, 8])
            .await
        else {
            panic!("batch must succeed");
        };
        assert_eq!(report.attempted(), 2);
        assert_eq!(a.calls(), vec![crate::endpoint::EndpointCall::EmergencyUnstake {
            caller: Address::from_low_byte(FACTORY),
            item_id: 7,
            destination: admin(),
        }]);
    }

    #[tokio::test]
    async fn emergency_unstake_validation() {
        let fx = Fixture::new();
        let a = fx.deploy(50);
        let unauthorized = fx
            .factory
            .emergency_batch_unstake(stranger(), &[pool_id(50)], &[1])
            .await;
        assert!(matches!(unauthorized, Err(FactoryError::Unauthorized(_))));
        let mismatch = fx
            .factory
            .emergency_batch_unstake(admin(), &[pool_id(50)], &[1, 2])
            .await;
        assert!(matches!(mismatch, Err(FactoryError::InvalidArgument(_))));
        let targets: Vec<PoolEndpointId> = (1..=11u8).map(pool_id).collect();
        let items: Vec<ItemId> = (1..=11u128).collect();
        let over = fx.factory.emergency_batch_unstake(admin(), &targets, &items).await;
        assert!(matches!(over, Err(FactoryError::InvalidArgument(_))));
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn reentrant_callback_is_refused_but_batch_completes() {
        let fx = Fixture::new();
        let reentrant = Arc::new(ReentrantEndpoint::default());
        let _ = reentrant.factory.set(Arc::downgrade(&fx.factory));
        fx.env
            .deploy_endpoint(pool_id(40), Arc::clone(&reentrant) as Arc<dyn PoolEndpoint>);
        let after = fx.deploy(50);

        let result = fx.factory.batch_claim_rewards(&[pool_id(40), pool_id(50)]).await;
        assert!(result.is_ok());
        assert_eq!(after.call_count(), 1);

        let observed = reentrant
            .observed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(
            observed,
            vec![
                "Some(ReentrantCall)".to_string(),
                "Some(ReentrantCall)".to_string(),
                "count=0".to_string(),
            ]
        );
        // lock is released once the outer batch returns
        assert!(fx.factory.batch_claim_rewards(&[pool_id(50)]).await.is_ok());
    }

    #[tokio::test]
    async fn independent_calls_wait_for_running_batch() {
        let fx = Fixture::new();
        let slow = Arc::new(SlowEndpoint::default());
        fx.env
            .deploy_endpoint(pool_id(40), Arc::clone(&slow) as Arc<dyn PoolEndpoint>);
        let other = fx.deploy(50);
        assert!(fx.factory.receive(stranger(), 100).await.is_ok());
        let new_admin = Address::from_low_byte(3);

        let factory = Arc::clone(&fx.factory);
        let batch = tokio::spawn(async move {
            factory
                .batch_claim_rewards(&[pool_id(40)])
                .await
                .map(|report| report.succeeded())
        });
        slow.entered.notified().await;

        let factory = Arc::clone(&fx.factory);
        let withdraw = tokio::spawn(async move {
            factory
                .emergency_withdraw(admin(), Address::from_low_byte(0x44), 0)
                .await
        });
        let factory = Arc::clone(&fx.factory);
        let second = tokio::spawn(async move {
            factory
                .batch_claim_rewards(&[pool_id(50)])
                .await
                .map(|report| report.succeeded())
        });
        let factory = Arc::clone(&fx.factory);
        let hand_over =
            tokio::spawn(async move { factory.transfer_ownership(admin(), new_admin).await });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!withdraw.is_finished());
        assert!(!second.is_finished());
        assert!(!hand_over.is_finished());
        assert_eq!(fx.factory.owner().await, admin());

        slow.release.notify_one();
        assert!(matches!(batch.await, Ok(Ok(1))));
        assert!(matches!(withdraw.await, Ok(Ok(100))));
        assert!(matches!(second.await, Ok(Ok(1))));
        assert!(matches!(hand_over.await, Ok(Ok(()))));
        assert_eq!(other.call_count(), 1);
        assert_eq!(fx.factory.balance().await, 0);
        assert_eq!(fx.factory.owner().await, new_admin);
    }

    #[tokio::test]
    async fn unresolvable_target_is_distinct_from_missing_code() {
        let fx = Fixture::new();
        fx.env.deploy_code(Address::from_low_byte(60));
        let Ok(report) = fx.factory.batch_claim_rewards(&[pool_id(60), pool_id(61)]).await else {
            panic!("batch must succeed");
        };
        assert!(matches!(
            report.outcomes.first(),
            Some((_, TargetOutcome::Failed(EndpointError::Unresolvable(_))))
        ));
        assert!(matches!(
            report.outcomes.get(1),
            Some((_, TargetOutcome::Failed(EndpointError::NoCode(_))))
        ));
    }

    // ── Creation validator ──────────────────────────────────────────────

    #[tokio::test]
    async fn create_pool_validates_then_refuses() {
        let fx = Fixture::new();
        fx.env.deploy_collection(
            collection(10),
            Arc::new(StaticCollection::new(ProbeBehavior::NonFungible)),
        );
        let result = fx.factory.create_pool(admin(), create_params(10, 50)).await;
        assert!(matches!(result, Err(FactoryError::NotImplemented(_))));
        assert_eq!(fx.factory.count().await, 0);
    }

    #[tokio::test]
    async fn create_pool_check_order() {
        let fx = Fixture::new();
        fx.deploy(50);
        fx.register(10, 50).await;
        fx.env.deploy_collection(
            collection(11),
            Arc::new(StaticCollection::new(ProbeBehavior::Unsupported)),
        );
        fx.env.deploy_collection(
            collection(12),
            Arc::new(StaticCollection::new(ProbeBehavior::Reverts)),
        );

        let unauthorized = fx.factory.create_pool(stranger(), create_params(11, 50)).await;
        assert!(matches!(unauthorized, Err(FactoryError::Unauthorized(_))));

        let mut zero_receipt = create_params(11, 500);
        zero_receipt.receipt = Address::ZERO;
        let zero = fx.factory.create_pool(admin(), zero_receipt).await;
        assert!(matches!(zero, Err(FactoryError::InvalidArgument(_))));

        let duplicate = fx.factory.create_pool(admin(), create_params(10, 500)).await;
        assert!(matches!(duplicate, Err(FactoryError::AlreadyExists(_))));

        let share = fx.factory.create_pool(admin(), create_params(11, 101)).await;
        assert!(matches!(share, Err(FactoryError::InvalidShareRange(101))));

        let unsupported = fx.factory.create_pool(admin(), create_params(11, 100)).await;
        assert!(matches!(unsupported, Err(FactoryError::InvalidCollection(_))));
        let reverting = fx.factory.create_pool(admin(), create_params(12, 0)).await;
        assert!(matches!(reverting, Err(FactoryError::InvalidCollection(_))));
        let missing = fx.factory.create_pool(admin(), create_params(13, 0)).await;
        assert!(matches!(missing, Err(FactoryError::InvalidCollection(_))));
    }

    // ── Funds ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn withdraw_zero_sweeps_everything() {
        let fx = Fixture::new();
        let to = Address::from_low_byte(0x44);
        assert!(fx.factory.receive(stranger(), 500).await.is_ok());
        assert!(fx.factory.receive(stranger(), 250).await.is_ok());
        let sent = fx.factory.emergency_withdraw(admin(), to, 0).await;
        assert_eq!(sent.ok(), Some(750));
        assert_eq!(fx.factory.balance().await, 0);
        assert_eq!(fx.env.balance_of(to), 750);
    }

    #[tokio::test]
    async fn withdraw_partial_amount() {
        let fx = Fixture::new();
        let to = Address::from_low_byte(0x44);
        assert!(fx.factory.receive(stranger(), 500).await.is_ok());
        assert_eq!(fx.factory.emergency_withdraw(admin(), to, 200).await.ok(), Some(200));
        assert_eq!(fx.factory.balance().await, 300);
    }

    #[tokio::test]
    async fn withdraw_failures_transfer_nothing() {
        let fx = Fixture::new();
        let to = Address::from_low_byte(0x44);

        let empty = fx.factory.emergency_withdraw(admin(), to, 0).await;
        assert!(matches!(empty, Err(FactoryError::InsufficientFunds { .. })));

        assert!(fx.factory.receive(stranger(), 100).await.is_ok());
        let too_much = fx.factory.emergency_withdraw(admin(), to, 101).await;
        assert!(matches!(too_much, Err(FactoryError::InsufficientFunds { .. })));
        let zero_dest = fx.factory.emergency_withdraw(admin(), Address::ZERO, 1).await;
        assert!(matches!(zero_dest, Err(FactoryError::InvalidArgument(_))));
        let unauthorized = fx.factory.emergency_withdraw(stranger(), stranger(), 1).await;
        assert!(matches!(unauthorized, Err(FactoryError::Unauthorized(_))));

        fx.env.reject_transfers_to(to);
        let rejected = fx.factory.emergency_withdraw(admin(), to, 50).await;
        assert!(matches!(rejected, Err(FactoryError::TransferFailed(_))));

        assert_eq!(fx.factory.balance().await, 100);
        assert_eq!(fx.env.balance_of(to), 0);
    }

    // ── Pool ownership ──────────────────────────────────────────────────

    #[tokio::test]
    async fn transfer_pool_ownership_calls_endpoint() {
        let fx = Fixture::new();
        let endpoint = fx.deploy(50);
        fx.register(10, 50).await;
        let new_owner = Address::from_low_byte(0x55);
        let result = fx
            .factory
            .transfer_pool_ownership(admin(), collection(10), new_owner)
            .await;
        assert!(result.is_ok());
        assert_eq!(endpoint.owner(), new_owner);

        // the factory no longer owns the endpoint, so a second hand-over fails
        let again = fx
            .factory
            .transfer_pool_ownership(admin(), collection(10), admin())
            .await;
        assert!(matches!(again, Err(FactoryError::TransferFailed(_))));
        let missing = fx
            .factory
            .transfer_pool_ownership(admin(), collection(11), admin())
            .await;
        assert!(matches!(missing, Err(FactoryError::NotFound(_))));
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn snapshot_restore_round_trip() {
        let fx = Fixture::new();
        for n in 0..3u8 {
            fx.deploy(50 + n);
            fx.register(10 + n, 50 + n).await;
        }
        assert!(fx.factory.receive(stranger(), 42).await.is_ok());
        let snapshot = fx.factory.snapshot().await;

        let other = Fixture::new();
        assert!(other.factory.restore(snapshot.clone(), 4).await.is_ok());
        assert_eq!(other.factory.snapshot().await, snapshot);
        assert_eq!(other.factory.balance().await, 42);
        assert_eq!(other.factory.all_pools().await, fx.factory.all_pools().await);
    }

    #[tokio::test]
    async fn snapshot_survives_json_with_large_balance() {
        let fx = Fixture::new();
        fx.deploy(50);
        fx.register(10, 50).await;
        assert!(fx.factory.receive(stranger(), u128::MAX).await.is_ok());
        let snapshot = fx.factory.snapshot().await;

        let Ok(json) = serde_json::to_value(&snapshot) else {
            panic!("snapshot must serialize");
        };
        assert_eq!(json["balance"], u128::MAX.to_string());
        let Ok(decoded) = serde_json::from_value::<FactorySnapshot>(json) else {
            panic!("snapshot must deserialize");
        };
        assert_eq!(decoded, snapshot);

        let other = Fixture::new();
        assert!(other.factory.restore(decoded, 2).await.is_ok());
        assert_eq!(other.factory.balance().await, u128::MAX);
        assert_eq!(other.factory.pool_for_collection(collection(10)).await, pool_id(50));
    }

    #[tokio::test]
    async fn events_after_restore_continue_the_sequence() {
        let fx = Fixture::new();
        for n in 0..2u8 {
            fx.deploy(50 + n);
            fx.register(10 + n, 50 + n).await;
        }
        let (snapshot, last_sequence) = fx.factory.checkpoint().await;
        assert_eq!(last_sequence, 2);

        let restarted = Fixture::new();
        restarted.deploy(52);
        assert!(restarted.factory.restore(snapshot, last_sequence).await.is_ok());
        let mut rx = restarted.factory.event_bus().subscribe();
        restarted.register(12, 52).await;
        let Ok(audit) = rx.recv().await else {
            panic!("expected event");
        };
        assert_eq!(audit.sequence, 3);
        assert_eq!(restarted.factory.count().await, 3);
    }

    #[tokio::test]
    async fn restore_rejects_corrupt_snapshot() {
        let fx = Fixture::new();
        let snapshot = FactorySnapshot {
            owner: admin(),
            records: vec![
                PoolRecord::new(collection(1), pool_id(2)),
                PoolRecord::new(collection(1), pool_id(3)),
            ],
            balance: "0".to_string(),
        };
        assert!(matches!(
            fx.factory.restore(snapshot, 0).await,
            Err(FactoryError::Persistence(_))
        ));
        assert_eq!(fx.factory.count().await, 0);
    }
}
