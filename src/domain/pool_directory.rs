//! Keyed store of registered pool endpoints with O(1) insert and removal.
//!
//! [`PoolDirectory`] keeps every [`PoolRecord`] in a dense vector plus a
//! `CollectionId → index` map. Removal swaps the victim with the last
//! element and truncates, so the enumeration order of the remaining pools
//! is **not** stable across removals. Callers must treat the sequence as an
//! unordered set that happens to support positional range reads.

use std::collections::HashMap;

use super::pool_record::{PoolInfo, PoolRecord};
use super::{CollectionId, PoolEndpointId};
use crate::error::FactoryError;

/// Directory of `(collection, pool endpoint)` records.
///
/// # Invariants
///
/// - at most one record per collection;
/// - `positions[records[i].collection] == i` for every `i`;
/// - `len() == records.len() == positions.len()`.
#[derive(Debug, Clone, Default)]
pub struct PoolDirectory {
    records: Vec<PoolRecord>,
    positions: HashMap<CollectionId, usize>,
}

impl PoolDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a directory from a persisted sequence, preserving its order.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidArgument`] or
    /// [`FactoryError::AlreadyExists`] if the records violate the directory
    /// invariants.
    pub fn from_records(records: Vec<PoolRecord>) -> Result<Self, FactoryError> {
        let mut directory = Self::new();
        for record in records {
            directory.insert(record)?;
        }
        Ok(directory)
    }

    /// Inserts a new record at the end of the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidArgument`] if either id is zero, or
    /// [`FactoryError::AlreadyExists`] if the collection is already mapped.
    pub fn insert(&mut self, record: PoolRecord) -> Result<(), FactoryError> {
        if record.collection.is_zero() || record.pool.is_zero() {
            return Err(FactoryError::InvalidArgument(
                "collection and pool must be non-zero".to_string(),
            ));
        }
        if self.positions.contains_key(&record.collection) {
            return Err(FactoryError::AlreadyExists(record.collection));
        }
        self.positions.insert(record.collection, self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Removes the record for `collection` by swap-and-pop.
    ///
    /// The element previously at the end of the sequence takes the removed
    /// slot.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::NotFound`] if the collection is unmapped.
    pub fn remove(&mut self, collection: CollectionId) -> Result<PoolRecord, FactoryError> {
        let index = *self
            .positions
            .get(&collection)
            .ok_or(FactoryError::NotFound(collection))?;
        if index >= self.records.len() {
            return Err(FactoryError::Internal(format!(
                "directory index {index} out of bounds for {collection}"
            )));
        }
        self.positions.remove(&collection);
        let removed = self.records.swap_remove(index);
        if let Some(moved) = self.records.get(index) {
            self.positions.insert(moved.collection, index);
        }
        Ok(removed)
    }

    /// Returns the endpoint mapped to `collection`, if any.
    #[must_use]
    pub fn get(&self, collection: CollectionId) -> Option<PoolEndpointId> {
        self.record(collection).map(|r| r.pool)
    }

    /// Returns the full record for `collection`, if any.
    #[must_use]
    pub fn record(&self, collection: CollectionId) -> Option<&PoolRecord> {
        self.positions
            .get(&collection)
            .and_then(|&i| self.records.get(i))
    }

    /// Returns `true` if `collection` has a mapping.
    #[must_use]
    pub fn contains(&self, collection: CollectionId) -> bool {
        self.positions.contains_key(&collection)
    }

    /// Returns a snapshot of every registered endpoint in sequence order.
    #[must_use]
    pub fn pools(&self) -> Vec<PoolEndpointId> {
        self.records.iter().map(|r| r.pool).collect()
    }

    /// Returns the endpoints at positions `start..end` of the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidArgument`] if `start >= end` or `end`
    /// exceeds the sequence length.
    pub fn range(&self, start: usize, end: usize) -> Result<Vec<PoolEndpointId>, FactoryError> {
        if start >= end {
            return Err(FactoryError::InvalidArgument(format!(
                "invalid range: start {start} must be below end {end}"
            )));
        }
        let slice = self.records.get(start..end).ok_or_else(|| {
            FactoryError::InvalidArgument(format!(
                "invalid range: end {end} exceeds length {}",
                self.records.len()
            ))
        })?;
        Ok(slice.iter().map(|r| r.pool).collect())
    }

    /// Looks up a single collection.
    #[must_use]
    pub fn info(&self, collection: CollectionId) -> PoolInfo {
        PoolInfo::from_lookup(self.get(collection))
    }

    /// Looks up many collections; output is parallel to the input.
    #[must_use]
    pub fn infos(&self, collections: &[CollectionId]) -> Vec<PoolInfo> {
        collections.iter().map(|&c| self.info(c)).collect()
    }

    /// Returns all records in sequence order.
    #[must_use]
    pub fn records(&self) -> &[PoolRecord] {
        &self.records
    }

    /// Returns the number of registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no pool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
