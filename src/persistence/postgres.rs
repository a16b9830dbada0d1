//! PostgreSQL implementation of the persistence layer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;

use super::models::{StoredEvent, StoredSnapshot};
use crate::config::FactoryConfig;
use crate::domain::AuditEvent;
use crate::error::FactoryError;
use crate::service::{FactorySnapshot, PoolFactory};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS audit_events (\
    id BIGSERIAL PRIMARY KEY,\
    sequence BIGINT NOT NULL,\
    event_type TEXT NOT NULL,\
    payload JSONB NOT NULL,\
    emitted_at TIMESTAMPTZ NOT NULL\
);\
CREATE TABLE IF NOT EXISTS directory_snapshots (\
    id BIGSERIAL PRIMARY KEY,\
    last_sequence BIGINT NOT NULL,\
    state_json JSONB NOT NULL,\
    snapshot_at TIMESTAMPTZ NOT NULL DEFAULT now()\
);";

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings of `config` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError::Persistence`] if the connection or schema
    /// setup fails.
    pub async fn connect(config: &FactoryConfig) -> Result<Self, FactoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| FactoryError::Persistence(e.to_string()))?;
        let persistence = Self::new(pool);
        persistence.ensure_schema().await?;
        Ok(persistence)
    }

    /// Creates the tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError::Persistence`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), FactoryError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| FactoryError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Appends an audit event to the event log.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError::Persistence`] on database failure.
    pub async fn save_event(&self, event: &AuditEvent) -> Result<i64, FactoryError> {
        let payload =
            serde_json::to_value(event).map_err(|e| FactoryError::Internal(e.to_string()))?;
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO audit_events (sequence, event_type, payload, emitted_at) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(i64::try_from(event.sequence).unwrap_or(i64::MAX))
        .bind(event.event.event_type_str())
        .bind(payload)
        .bind(event.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FactoryError::Persistence(e.to_string()))?;

        Ok(row)
    }

    /// Saves a factory state snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError::Persistence`] on database failure.
    pub async fn save_snapshot(
        &self,
        snapshot: &FactorySnapshot,
        last_sequence: u64,
    ) -> Result<i64, FactoryError> {
        let state_json =
            serde_json::to_value(snapshot).map_err(|e| FactoryError::Internal(e.to_string()))?;
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO directory_snapshots (last_sequence, state_json) \
             VALUES ($1, $2) RETURNING id",
        )
        .bind(i64::try_from(last_sequence).unwrap_or(i64::MAX))
        .bind(state_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FactoryError::Persistence(e.to_string()))?;

        Ok(row)
    }

    /// Loads the most recent snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError::Persistence`] on database failure.
    pub async fn load_latest_snapshot(&self) -> Result<Option<StoredSnapshot>, FactoryError> {
        let row = sqlx::query_as::<_, (i64, i64, serde_json::Value, DateTime<Utc>)>(
            "SELECT id, last_sequence, state_json, snapshot_at FROM directory_snapshots \
             ORDER BY snapshot_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FactoryError::Persistence(e.to_string()))?;

        Ok(row.map(|(id, last_sequence, state_json, snapshot_at)| StoredSnapshot {
            id,
            last_sequence,
            state_json,
            snapshot_at,
        }))
    }

    /// Loads events numbered after `after_sequence`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError::Persistence`] on database failure.
    pub async fn load_events_after(
        &self,
        after_sequence: i64,
    ) -> Result<Vec<StoredEvent>, FactoryError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, serde_json::Value, DateTime<Utc>)>(
            "SELECT id, sequence, event_type, payload, emitted_at FROM audit_events \
             WHERE sequence > $1 ORDER BY sequence ASC, id ASC",
        )
        .bind(after_sequence)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FactoryError::Persistence(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, sequence, event_type, payload, emitted_at)| StoredEvent {
                    id,
                    sequence,
                    event_type,
                    payload,
                    emitted_at,
                },
            )
            .collect())
    }

    /// Restores the latest snapshot into `factory` and resumes the audit
    /// stream after the newest stored event. Returns `true` if a snapshot
    /// was found.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError::Persistence`] if loading or decoding fails.
    pub async fn restore_into(&self, factory: &PoolFactory) -> Result<bool, FactoryError> {
        let Some(stored) = self.load_latest_snapshot().await? else {
            return Ok(false);
        };
        let snapshot: FactorySnapshot = serde_json::from_value(stored.state_json)
            .map_err(|e| FactoryError::Persistence(format!("snapshot {}: {e}", stored.id)))?;
        let trailing = self.load_events_after(stored.last_sequence).await?;
        if let Some(newest) = trailing.last() {
            tracing::warn!(
                snapshot_id = stored.id,
                trailing = trailing.len(),
                newest_type = %newest.event_type,
                "audit log is ahead of the latest snapshot"
            );
        }
        let last_sequence = resume_sequence(stored.last_sequence, &trailing);
        factory.restore(snapshot, last_sequence).await?;
        tracing::info!(
            snapshot_id = stored.id,
            at = %stored.snapshot_at,
            last_sequence,
            "snapshot restored"
        );
        Ok(true)
    }

    /// Saves a consistent snapshot of `factory`, logging failures.
    async fn checkpoint(&self, factory: &PoolFactory) {
        let (snapshot, last_sequence) = factory.checkpoint().await;
        match self.save_snapshot(&snapshot, last_sequence).await {
            Ok(id) => tracing::debug!(snapshot_id = id, last_sequence, "snapshot saved"),
            Err(e) => tracing::error!(last_sequence, error = %e, "failed to save snapshot"),
        }
    }
}

/// Highest sequence number already used, from the snapshot position and the
/// events stored after it.
fn resume_sequence(snapshot_sequence: i64, trailing: &[StoredEvent]) -> u64 {
    let newest = trailing
        .iter()
        .map(|event| event.sequence)
        .fold(snapshot_sequence, i64::max);
    u64::try_from(newest).unwrap_or(0)
}

/// Persists every event received on `rx` until the bus closes.
///
/// Each event is appended to the audit log when `log_events` is set. Events
/// that change the factory's own state are followed by a fresh snapshot, so
/// an acknowledged mutation survives a restart.
pub async fn run_event_writer(
    persistence: PostgresPersistence,
    factory: Arc<PoolFactory>,
    mut rx: broadcast::Receiver<AuditEvent>,
    log_events: bool,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if log_events && let Err(e) = persistence.save_event(&event).await {
                    tracing::error!(sequence = event.sequence, error = %e, "failed to persist audit event");
                }
                if event.event.changes_factory_state() {
                    persistence.checkpoint(&factory).await;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "audit writer lagged behind event bus");
                persistence.checkpoint(&factory).await;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::debug!("audit writer stopped");
}

/// Writes a state snapshot every `interval`, as a backstop to the
/// per-mutation snapshots of [`run_event_writer`].
pub async fn run_snapshotter(
    persistence: PostgresPersistence,
    factory: Arc<PoolFactory>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        persistence.checkpoint(&factory).await;
    }
}
