//! Per-collection handlers: lookups, removal, pool ownership hand-over.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::caller::Caller;
use crate::api::dto::{
    ExistsResponse, PoolAddressResponse, PoolInfoResponse, TransferPoolOwnershipRequest,
    parse_address, parse_collection,
};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, FactoryError};

/// `GET /collections/{id}/pool`: Registered endpoint or the zero address.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] on a malformed identifier.
#[utoipa::path(
    get,
    path = "/api/v1/collections/{id}/pool",
    tag = "Collections",
    summary = "Get the pool for a collection",
    params(("id" = String, Path, description = "Collection address")),
    responses(
        (status = 200, description = "Endpoint or zero address", body = PoolAddressResponse),
        (status = 400, description = "Malformed address", body = ErrorResponse),
    )
)]
pub async fn pool_for_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, FactoryError> {
    let collection = parse_collection("id", &id)?;
    let pool = state.factory.pool_for_collection(collection).await;
    Ok(Json(PoolAddressResponse {
        pool: pool.to_string(),
    }))
}

/// `GET /collections/{id}/info`: Endpoint plus registration flag.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] on a malformed identifier.
#[utoipa::path(
    get,
    path = "/api/v1/collections/{id}/info",
    tag = "Collections",
    summary = "Get pool info for a collection",
    params(("id" = String, Path, description = "Collection address")),
    responses(
        (status = 200, description = "Pool info", body = PoolInfoResponse),
        (status = 400, description = "Malformed address", body = ErrorResponse),
    )
)]
pub async fn pool_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, FactoryError> {
    let collection = parse_collection("id", &id)?;
    let info = state.factory.pool_info(collection).await;
    Ok(Json(PoolInfoResponse::from(info)))
}

/// `GET /collections/{id}/exists`: Registration flag.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] on a malformed identifier.
#[utoipa::path(
    get,
    path = "/api/v1/collections/{id}/exists",
    tag = "Collections",
    summary = "Check whether a collection is registered",
    params(("id" = String, Path, description = "Collection address")),
    responses(
        (status = 200, description = "Registration flag", body = ExistsResponse),
        (status = 400, description = "Malformed address", body = ErrorResponse),
    )
)]
pub async fn pool_exists(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, FactoryError> {
    let collection = parse_collection("id", &id)?;
    Ok(Json(ExistsResponse {
        exists: state.factory.pool_exists(collection).await,
    }))
}

/// `DELETE /collections/{id}`: Remove a collection's pool record.
///
/// # Errors
///
/// Returns [`FactoryError::Unauthorized`] or [`FactoryError::NotFound`].
#[utoipa::path(
    delete,
    path = "/api/v1/collections/{id}",
    tag = "Collections",
    summary = "Remove a pool",
    description = "Deletes the collection mapping. The last endpoint in the directory takes the removed slot.",
    params(
        ("id" = String, Path, description = "Collection address"),
        ("X-Caller" = String, Header, description = "Caller address"),
    ),
    responses(
        (status = 204, description = "Pool removed"),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Collection not registered", body = ErrorResponse),
    )
)]
pub async fn remove_pool(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, FactoryError> {
    let collection = parse_collection("id", &id)?;
    state.factory.remove_pool(caller, collection).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /collections/{id}/owner`: Hand the pool endpoint to a new owner.
///
/// # Errors
///
/// Returns [`FactoryError`] on authorization failure, a zero owner, an
/// unknown collection, a re-entrant call or an endpoint rejection.
#[utoipa::path(
    post,
    path = "/api/v1/collections/{id}/owner",
    tag = "Collections",
    summary = "Transfer pool endpoint ownership",
    request_body = TransferPoolOwnershipRequest,
    params(
        ("id" = String, Path, description = "Collection address"),
        ("X-Caller" = String, Header, description = "Caller address"),
    ),
    responses(
        (status = 204, description = "Ownership handed over"),
        (status = 400, description = "Zero or malformed address", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Collection not registered", body = ErrorResponse),
        (status = 409, description = "Re-entrant call from a collaborator", body = ErrorResponse),
        (status = 502, description = "Endpoint rejected the transfer", body = ErrorResponse),
    )
)]
pub async fn transfer_pool_ownership(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TransferPoolOwnershipRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let collection = parse_collection("id", &id)?;
    let new_owner = parse_address("new_owner", &req.new_owner)?;
    state
        .factory
        .transfer_pool_ownership(caller, collection, new_owner)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections/{id}", delete(remove_pool))
        .route("/collections/{id}/pool", get(pool_for_collection))
        .route("/collections/{id}/info", get(pool_info))
        .route("/collections/{id}/exists", get(pool_exists))
        .route("/collections/{id}/owner", post(transfer_pool_ownership))
}
