//! Administrative principal handlers: query, transfer, renounce.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::caller::Caller;
use crate::api::dto::{AddressRequest, OwnerResponse, parse_address};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, FactoryError};

/// `GET /owner`: Current administrative principal.
#[utoipa::path(
    get,
    path = "/api/v1/owner",
    tag = "Ownership",
    summary = "Get the administrative principal",
    description = "Returns the current owner, or the zero address after renouncement.",
    responses(
        (status = 200, description = "Current owner", body = OwnerResponse),
    )
)]
pub async fn get_owner(State(state): State<AppState>) -> impl IntoResponse {
    Json(OwnerResponse {
        owner: state.factory.owner().await.to_string(),
    })
}

/// `POST /owner/transfer`: Hand the principal role to another address.
///
/// # Errors
///
/// Returns [`FactoryError::Unauthorized`] if the caller is not the owner
/// and [`FactoryError::InvalidArgument`] for the zero address.
#[utoipa::path(
    post,
    path = "/api/v1/owner/transfer",
    tag = "Ownership",
    summary = "Transfer ownership",
    request_body = AddressRequest,
    params(("X-Caller" = String, Header, description = "Caller address")),
    responses(
        (status = 204, description = "Ownership transferred"),
        (status = 400, description = "Zero or malformed address", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
    )
)]
pub async fn transfer_ownership(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<AddressRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let new_owner = parse_address("address", &req.address)?;
    state.factory.transfer_ownership(caller, new_owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /owner/renounce`: Give up the principal role permanently.
///
/// # Errors
///
/// Returns [`FactoryError::Unauthorized`] if the caller is not the owner.
#[utoipa::path(
    post,
    path = "/api/v1/owner/renounce",
    tag = "Ownership",
    summary = "Renounce ownership",
    description = "Sets the owner to the zero address. Every privileged operation fails afterwards.",
    params(("X-Caller" = String, Header, description = "Caller address")),
    responses(
        (status = 204, description = "Ownership renounced"),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
    )
)]
pub async fn renounce_ownership(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<impl IntoResponse, FactoryError> {
    state.factory.renounce_ownership(caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ownership routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/owner", get(get_owner))
        .route("/owner/transfer", post(transfer_ownership))
        .route("/owner/renounce", post(renounce_ownership))
}
