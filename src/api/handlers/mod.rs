//! REST endpoint handlers organized by resource.

pub mod batch;
pub mod collection;
pub mod events;
pub mod funds;
pub mod owner;
pub mod pool;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(owner::routes())
        .merge(pool::routes())
        .merge(collection::routes())
        .merge(batch::routes())
        .merge(funds::routes())
        .merge(events::routes())
}
