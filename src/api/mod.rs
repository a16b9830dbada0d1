//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`. Mutating endpoints
//! read the caller from the `X-Caller` header (see [`caller::Caller`]).

pub mod caller;
pub mod dto;
pub mod extract;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Hydra Pool Factory API",
        description = "Registry and batch orchestrator for per-collection NFT staking pools"
    ),
    paths(
        handlers::system::health_handler,
        handlers::system::status_handler,
        handlers::owner::get_owner,
        handlers::owner::transfer_ownership,
        handlers::owner::renounce_ownership,
        handlers::pool::register_pool,
        handlers::pool::create_pool,
        handlers::pool::list_pools,
        handlers::pool::pools_in_range,
        handlers::pool::pool_count,
        handlers::pool::multiple_pool_infos,
        handlers::collection::pool_for_collection,
        handlers::collection::pool_info,
        handlers::collection::pool_exists,
        handlers::collection::remove_pool,
        handlers::collection::transfer_pool_ownership,
        handlers::batch::batch_claim_rewards,
        handlers::batch::batch_claim_rewards_for,
        handlers::batch::emergency_batch_unstake,
        handlers::funds::get_balance,
        handlers::funds::deposit,
        handlers::funds::withdraw,
        handlers::events::recent_events,
    ),
    tags(
        (name = "System", description = "Health and status"),
        (name = "Ownership", description = "Administrative principal"),
        (name = "Pools", description = "Pool directory"),
        (name = "Collections", description = "Per-collection lookups and management"),
        (name = "Batches", description = "Fault-tolerant fan-out to pool endpoints"),
        (name = "Funds", description = "Held value"),
        (name = "Events", description = "Audit log"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    with_swagger_ui(
        Router::new()
            .nest("/api/v1", handlers::routes())
            .merge(handlers::system::routes()),
    )
}

#[cfg(feature = "swagger-ui")]
fn with_swagger_ui(router: Router<AppState>) -> Router<AppState> {
    router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-doc/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_swagger_ui(router: Router<AppState>) -> Router<AppState> {
    router
}

/// Builds the full application: REST routes, `/ws` and the HTTP layers,
/// bound to `state`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
