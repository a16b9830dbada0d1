//! Pool directory handlers: register, create, list, range, count, bulk info.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::caller::Caller;
use crate::api::dto::{
    CreatePoolRequest, MultiPoolInfoRequest, MultiPoolInfoResponse, PoolCountResponse,
    PoolListResponse, RangeParams, RegisterPoolRequest, parse_address, parse_amount,
    parse_collection, parse_endpoint,
};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::app_state::AppState;
use crate::domain::CollectionId;
use crate::error::{ErrorResponse, FactoryError};
use crate::service::CreatePoolParams;

/// `POST /pools`: Register an existing pool endpoint for a collection.
///
/// # Errors
///
/// Returns [`FactoryError`] on authorization failure, zero identifiers or
/// an already registered collection.
#[utoipa::path(
    post,
    path = "/api/v1/pools",
    tag = "Pools",
    summary = "Register a pool",
    description = "Maps a collection to an already deployed staking pool endpoint and appends it to the directory.",
    request_body = RegisterPoolRequest,
    params(("X-Caller" = String, Header, description = "Caller address")),
    responses(
        (status = 201, description = "Pool registered"),
        (status = 400, description = "Zero or malformed identifier", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 409, description = "Collection already registered", body = ErrorResponse),
    )
)]
pub async fn register_pool(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<RegisterPoolRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let collection = parse_collection("collection", &req.collection)?;
    let pool = parse_endpoint("pool", &req.pool)?;
    state.factory.register_pool(caller, collection, pool).await?;
    Ok(StatusCode::CREATED)
}

/// `POST /pools/create`: Validate pool creation parameters.
///
/// Creation is disabled: a request that passes every check still fails
/// with 501 and leaves no trace.
///
/// # Errors
///
/// Always returns a [`FactoryError`].
#[utoipa::path(
    post,
    path = "/api/v1/pools/create",
    tag = "Pools",
    summary = "Create a pool (disabled)",
    description = "Runs authorization, identifier, duplicate, share-range and collection capability checks in that order, then reports that creation is not implemented.",
    request_body = CreatePoolRequest,
    params(("X-Caller" = String, Header, description = "Caller address")),
    responses(
        (status = 400, description = "Invalid identifier or share", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 409, description = "Collection already registered", body = ErrorResponse),
        (status = 422, description = "Collection fails the capability probe", body = ErrorResponse),
        (status = 501, description = "Validation passed; creation disabled", body = ErrorResponse),
    )
)]
pub async fn create_pool(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreatePoolRequest>,
) -> Result<StatusCode, FactoryError> {
    let params = CreatePoolParams {
        collection: parse_collection("collection", &req.collection)?,
        receipt: parse_address("receipt", &req.receipt)?,
        central_pool: parse_address("central_pool", &req.central_pool)?,
        fee_amount: parse_amount("fee_amount", &req.fee_amount)?,
        central_share: req.central_share,
    };
    let never = state.factory.create_pool(caller, params).await?;
    match never {}
}

/// `GET /pools`: Every registered endpoint in directory order.
#[utoipa::path(
    get,
    path = "/api/v1/pools",
    tag = "Pools",
    summary = "List pools",
    description = "Returns the full ordered sequence of registered endpoints. Order changes after removals.",
    responses(
        (status = 200, description = "Endpoint list", body = PoolListResponse),
    )
)]
pub async fn list_pools(State(state): State<AppState>) -> impl IntoResponse {
    let pools = state.factory.all_pools().await;
    Json(PoolListResponse::from_endpoints(&pools))
}

/// `GET /pools/range`: Endpoints at positions `start..end`.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] if `start >= end` or
/// `end > count`.
#[utoipa::path(
    get,
    path = "/api/v1/pools/range",
    tag = "Pools",
    summary = "List a range of pools",
    params(RangeParams),
    responses(
        (status = 200, description = "Endpoint slice", body = PoolListResponse),
        (status = 400, description = "Invalid range", body = ErrorResponse),
    )
)]
pub async fn pools_in_range(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RangeParams>,
) -> Result<impl IntoResponse, FactoryError> {
    let pools = state
        .factory
        .pools_in_range(params.start, params.end)
        .await?;
    Ok(Json(PoolListResponse::from_endpoints(&pools)))
}

/// `GET /pools/count`: Number of registered collections.
#[utoipa::path(
    get,
    path = "/api/v1/pools/count",
    tag = "Pools",
    summary = "Count pools",
    responses(
        (status = 200, description = "Registered collection count", body = PoolCountResponse),
    )
)]
pub async fn pool_count(State(state): State<AppState>) -> impl IntoResponse {
    Json(PoolCountResponse {
        count: state.factory.count().await,
    })
}

/// `POST /pools/info`: Bulk lookup, aligned with the request order.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] on malformed addresses or when
/// the configured lookup limit is exceeded.
#[utoipa::path(
    post,
    path = "/api/v1/pools/info",
    tag = "Pools",
    summary = "Look up several collections",
    description = "Returns the endpoint and registration flag for each collection. Unknown collections yield the zero address and false.",
    request_body = MultiPoolInfoRequest,
    responses(
        (status = 200, description = "Aligned lookup results", body = MultiPoolInfoResponse),
        (status = 400, description = "Malformed address or too many collections", body = ErrorResponse),
    )
)]
pub async fn multiple_pool_infos(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<MultiPoolInfoRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let collections = req
        .collections
        .iter()
        .map(|raw| parse_collection("collections", raw))
        .collect::<Result<Vec<CollectionId>, _>>()?;
    let infos = state.factory.multiple_pool_infos(&collections).await?;
    Ok(Json(MultiPoolInfoResponse::from_infos(&infos)))
}

/// Pool directory routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pools", post(register_pool).get(list_pools))
        .route("/pools/create", post(create_pool))
        .route("/pools/range", get(pools_in_range))
        .route("/pools/count", get(pool_count))
        .route("/pools/info", post(multiple_pool_infos))
}
