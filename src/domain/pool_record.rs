//! Directory record pairing a collection with its pool endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollectionId, PoolEndpointId};

/// One registered `(collection, pool endpoint)` pair.
///
/// At most one record exists per collection. The timestamp is operational
/// metadata only and takes no part in equality of directory contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Collection the endpoint serves.
    pub collection: CollectionId,
    /// Registered pool endpoint.
    pub pool: PoolEndpointId,
    /// When the record was registered.
    pub registered_at: DateTime<Utc>,
}

impl PoolRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(collection: CollectionId, pool: PoolEndpointId) -> Self {
        Self {
            collection,
            pool,
            registered_at: Utc::now(),
        }
    }
}

/// Result of a single directory lookup: the mapped endpoint (zero when
/// absent) and whether a mapping exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolInfo {
    /// Mapped endpoint, or [`PoolEndpointId::ZERO`].
    pub pool: PoolEndpointId,
    /// `true` when the collection has a non-zero mapping.
    pub exists: bool,
}

impl PoolInfo {
    /// Lookup result for an unmapped collection.
    pub const ABSENT: Self = Self {
        pool: PoolEndpointId::ZERO,
        exists: false,
    };

    /// Builds a lookup result from an optional mapping.
    #[must_use]
    pub fn from_lookup(pool: Option<PoolEndpointId>) -> Self {
        match pool {
            Some(pool) if !pool.is_zero() => Self { pool, exists: true },
            _ => Self::ABSENT,
        }
    }
}
