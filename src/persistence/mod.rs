//! Persistence layer: PostgreSQL audit log and directory snapshots.
//!
//! Durable storage of audit events and periodic state snapshots through
//! `sqlx::PgPool`. Snapshots are restored into the factory at startup.

pub mod models;
pub mod postgres;

pub use postgres::{PostgresPersistence, run_event_writer, run_snapshotter};
