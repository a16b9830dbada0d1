//! Broadcast channel and bounded in-process log for audit events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every factory
//! mutation publishes a [`FactoryEvent`] through the bus, which stamps it
//! with a sequence number, keeps it in a bounded ring of recent events and
//! forwards it to every subscriber (WebSocket connections, the persistence
//! writer).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;

use super::{AuditEvent, FactoryEvent};

/// Broadcast bus for [`AuditEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers. The same capacity bounds the recent-event
/// log.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuditEvent>,
    sequence: Arc<AtomicU64>,
    recent: Arc<Mutex<VecDeque<AuditEvent>>>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    /// Stamps and publishes an event to all subscribers.
    ///
    /// Returns the stamped event. If there are no active receivers the
    /// broadcast is silently skipped; the event is still logged.
    pub fn publish(&self, event: FactoryEvent) -> AuditEvent {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let audit = AuditEvent {
            sequence,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut recent = self
                .recent
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if recent.len() >= self.capacity {
                recent.pop_front();
            }
            recent.push_back(audit.clone());
        }

        let delivered = self.sender.send(audit.clone()).unwrap_or(0);
        tracing::debug!(
            sequence,
            event_type = audit.event.event_type_str(),
            delivered,
            "audit event published"
        );
        audit
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.sender.subscribe()
    }

    /// Returns up to `limit` most recent events, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let recent = self
            .recent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let skip = recent.len().saturating_sub(limit);
        recent.iter().skip(skip).cloned().collect()
    }

    /// Returns the sequence number of the last published event (0 if none).
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Continues numbering after `sequence`, so the next published event
    /// gets `sequence + 1`. Never moves the counter backwards.
    pub fn resume_from(&self, sequence: u64) {
        let previous = self.sequence.fetch_max(sequence, Ordering::SeqCst);
        tracing::debug!(previous, resumed = sequence.max(previous), "audit sequence resumed");
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Address, CollectionId, PoolEndpointId};

    fn make_event(n: u8) -> FactoryEvent {
        FactoryEvent::PoolRegistered {
            collection: CollectionId::new(Address::from_low_byte(n)),
            pool: PoolEndpointId::new(Address::from_low_byte(n.wrapping_add(100))),
        }
    }

    #[test]
    fn publish_without_receivers_still_logs() {
        let bus = EventBus::new(100);
        let audit = bus.publish(make_event(1));
        assert_eq!(audit.sequence, 1);
        assert_eq!(bus.recent(10).len(), 1);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        bus.publish(make_event(3));

        let Ok(audit) = rx.recv().await else {
            panic!("expected to receive event");
        };
        assert_eq!(audit.event, make_event(3));
    }

    #[test]
    fn sequence_is_monotonic() {
        let bus = EventBus::new(100);
        let a = bus.publish(make_event(1));
        let b = bus.publish(make_event(2));
        assert!(b.sequence > a.sequence);
        assert_eq!(bus.last_sequence(), b.sequence);
    }

    #[test]
    fn resume_continues_numbering() {
        let bus = EventBus::new(100);
        bus.resume_from(41);
        assert_eq!(bus.last_sequence(), 41);
        assert_eq!(bus.publish(make_event(1)).sequence, 42);

        // an older position never rewinds the counter
        bus.resume_from(7);
        assert_eq!(bus.publish(make_event(2)).sequence, 43);
    }

    #[test]
    fn recent_log_is_bounded() {
        let bus = EventBus::new(3);
        for n in 1..=5 {
            bus.publish(make_event(n));
        }
        let recent = bus.recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.first().map(|e| e.sequence), Some(3));
        assert_eq!(bus.recent(1).first().map(|e| e.sequence), Some(5));
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);
        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);
        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
