//! Per-connection subscription manager.
//!
//! Tracks which collections a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

use crate::domain::{AuditEvent, CollectionId};

/// Manages the set of collection subscriptions for a single WebSocket
/// connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed collections. Ignored while `subscribe_all` is set.
    collections: HashSet<CollectionId>,
    /// Whether the client subscribes to everything (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds collections to the subscription set. `wildcard` enables `"*"`.
    pub fn subscribe(&mut self, ids: &[CollectionId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.collections.extend(ids.iter().copied());
    }

    /// Removes collections from the subscription set. `wildcard` clears
    /// `"*"`.
    pub fn unsubscribe(&mut self, ids: &[CollectionId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.collections.remove(id);
        }
    }

    /// Returns `true` if the event passes the subscription filter.
    ///
    /// Events that concern no collection reach wildcard subscribers only.
    #[must_use]
    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.subscribe_all
            || event
                .event
                .collection()
                .is_some_and(|c| self.collections.contains(&c))
    }

    /// Returns the number of explicitly subscribed collections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.collections.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
