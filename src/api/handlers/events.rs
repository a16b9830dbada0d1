//! Audit log handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::EventsParams;
use crate::api::extract::ApiQuery;
use crate::app_state::AppState;
use crate::domain::AuditEvent;
use crate::error::ErrorResponse;

/// `GET /events`: Most recent audit events, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List recent audit events",
    description = "Returns up to `limit` of the most recently emitted events from the in-memory log.",
    params(EventsParams),
    responses(
        (status = 200, description = "Recent events", body = Vec<AuditEvent>),
        (status = 400, description = "Malformed query", body = ErrorResponse),
    )
)]
pub async fn recent_events(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<EventsParams>,
) -> impl IntoResponse {
    Json(state.event_bus.recent(params.limit))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(recent_events))
}
