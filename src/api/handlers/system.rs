//! System endpoints: health check and factory status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Factory status summary.
#[derive(Debug, Serialize, ToSchema)]
struct StatusResponse {
    factory: String,
    owner: String,
    pool_count: usize,
    balance: String,
    last_event_sequence: u64,
    subscribers: usize,
}

/// `GET /status`: Factory identity and counters.
#[utoipa::path(
    get,
    path = "/status",
    tag = "System",
    summary = "Factory status",
    description = "Returns the factory address, owner, directory size, held balance and audit stream position.",
    responses(
        (status = 200, description = "Factory status", body = StatusResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let factory = &state.factory;
    Json(StatusResponse {
        factory: factory.address().to_string(),
        owner: factory.owner().await.to_string(),
        pool_count: factory.count().await,
        balance: factory.balance().await.to_string(),
        last_event_sequence: state.event_bus.last_sequence(),
        subscribers: state.event_bus.receiver_count(),
    })
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
}
