//! Audit events emitted on every factory mutation.
//!
//! Events are append-only facts for external observers. They are broadcast
//! through the [`super::EventBus`], streamed to WebSocket subscribers and
//! optionally appended to the PostgreSQL audit log. They are never replayed
//! as commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{Address, CollectionId, PoolEndpointId};

/// Domain event describing a single state mutation.
///
/// Value amounts are string-encoded to preserve `u128` precision in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum FactoryEvent {
    /// The administrative principal changed (including renouncement, where
    /// `new_owner` is the zero address).
    OwnershipTransferred {
        /// Principal before the change.
        #[schema(value_type = String)]
        previous_owner: Address,
        /// Principal after the change.
        #[schema(value_type = String)]
        new_owner: Address,
    },

    /// A pool endpoint was registered for a collection.
    PoolRegistered {
        /// Collection identifier.
        #[schema(value_type = String)]
        collection: CollectionId,
        /// Registered endpoint.
        #[schema(value_type = String)]
        pool: PoolEndpointId,
    },

    /// A collection's pool record was removed.
    PoolRemoved {
        /// Collection identifier.
        #[schema(value_type = String)]
        collection: CollectionId,
        /// Endpoint that was mapped.
        #[schema(value_type = String)]
        pool: PoolEndpointId,
    },

    /// Ownership of a registered pool endpoint was handed over.
    PoolOwnershipTransferred {
        /// Collection identifier.
        #[schema(value_type = String)]
        collection: CollectionId,
        /// Endpoint whose ownership moved.
        #[schema(value_type = String)]
        pool: PoolEndpointId,
        /// New endpoint owner.
        #[schema(value_type = String)]
        new_owner: Address,
    },

    /// Held balance was swept by the principal.
    FundsWithdrawn {
        /// Recipient of the sweep.
        #[schema(value_type = String)]
        destination: Address,
        /// Amount transferred (string-encoded u128).
        amount: String,
    },

    /// Unsolicited value was accepted.
    FundsReceived {
        /// Sender of the value.
        #[schema(value_type = String)]
        sender: Address,
        /// Amount received (string-encoded u128).
        amount: String,
    },
}

impl FactoryEvent {
    /// Returns the collection this event concerns, if any.
    #[must_use]
    pub const fn collection(&self) -> Option<CollectionId> {
        match self {
            Self::PoolRegistered { collection, .. }
            | Self::PoolRemoved { collection, .. }
            | Self::PoolOwnershipTransferred { collection, .. } => Some(*collection),
            Self::OwnershipTransferred { .. }
            | Self::FundsWithdrawn { .. }
            | Self::FundsReceived { .. } => None,
        }
    }

    /// Returns `true` if the event reflects a change of the factory's own
    /// persisted state (principal, directory or balance).
    #[must_use]
    pub const fn changes_factory_state(&self) -> bool {
        !matches!(self, Self::PoolOwnershipTransferred { .. })
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::OwnershipTransferred { .. } => "ownership_transferred",
            Self::PoolRegistered { .. } => "pool_registered",
            Self::PoolRemoved { .. } => "pool_removed",
            Self::PoolOwnershipTransferred { .. } => "pool_ownership_transferred",
            Self::FundsWithdrawn { .. } => "funds_withdrawn",
            Self::FundsReceived { .. } => "funds_received",
        }
    }
}

/// A [`FactoryEvent`] stamped with its position in the audit stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuditEvent {
    /// Monotonic sequence number, starting at 1.
    pub sequence: u64,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    #[serde(flatten)]
    pub event: FactoryEvent,
}
