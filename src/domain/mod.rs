//! Domain layer: identifiers, access control, pool directory and events.
//!
//! This module holds the state the factory guards (principal and
//! directory), the audit event model with its broadcast bus, and the
//! ordering lock with re-entry detection shared by guarded entry points.

pub mod access_control;
pub mod address;
pub mod event_bus;
pub mod factory_event;
pub mod pool_directory;
pub mod pool_record;
pub mod reentrancy;

pub use access_control::AccessControl;
pub use address::{Address, AddressParseError, CollectionId, PoolEndpointId};
pub use event_bus::EventBus;
pub use factory_event::{AuditEvent, FactoryEvent};
pub use pool_directory::PoolDirectory;
pub use pool_record::{PoolInfo, PoolRecord};
pub use reentrancy::ReentrancyGuard;
