//! Database models for audit events and directory snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored row from the `audit_events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Auto-increment row ID.
    pub id: i64,
    /// Bus sequence number of the event.
    pub sequence: i64,
    /// Event type discriminator (e.g. `"pool_registered"`).
    pub event_type: String,
    /// JSONB payload with the full event.
    pub payload: serde_json::Value,
    /// Emission timestamp.
    pub emitted_at: DateTime<Utc>,
}

/// A stored row from the `directory_snapshots` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Auto-increment row ID.
    pub id: i64,
    /// Last audit sequence number covered by the snapshot.
    pub last_sequence: i64,
    /// [`crate::service::FactorySnapshot`] as JSONB.
    pub state_json: serde_json::Value,
    /// Snapshot timestamp.
    pub snapshot_at: DateTime<Utc>,
}
