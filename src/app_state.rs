//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::PoolFactory;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The factory holding all directory state and business logic.
    pub factory: Arc<PoolFactory>,
    /// Event bus for the audit log and WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Builds the state around `factory`, sharing its event bus.
    #[must_use]
    pub fn new(factory: Arc<PoolFactory>) -> Self {
        let event_bus = factory.event_bus().clone();
        Self { factory, event_bus }
    }
}
