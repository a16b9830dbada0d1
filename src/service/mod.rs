//! Service layer: business logic orchestration.
//!
//! [`PoolFactory`] authorizes and applies directory mutations, dispatches
//! fan-out batches to pool endpoints and emits audit events through the
//! [`super::domain::EventBus`].

pub mod batch;
pub mod pool_factory;

pub use batch::{BatchReceipt, BatchReport, TargetOutcome};
pub use pool_factory::{
    CreatePoolParams, FactorySnapshot, MAX_CENTRAL_SHARE, MAX_CLAIM_BATCH, MAX_UNSTAKE_BATCH,
    PoolFactory,
};
