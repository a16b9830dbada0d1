//! Batch fan-out handlers.
//!
//! A batch succeeds as a whole once it is dispatched; per-target failures
//! are logged server-side and never surface in the response.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::caller::Caller;
use crate::api::dto::{
    BatchResponse, ClaimBatchRequest, ClaimForBatchRequest, UnstakeBatchRequest, parse_address,
    parse_amount, parse_endpoint,
};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::domain::PoolEndpointId;
use crate::endpoint::ItemId;
use crate::error::{ErrorResponse, FactoryError};

fn parse_pools(raw: &[String]) -> Result<Vec<PoolEndpointId>, FactoryError> {
    raw.iter().map(|p| parse_endpoint("pools", p)).collect()
}

/// `POST /batch/claim`: Claim rewards on up to 20 pools.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] for an empty or over-long
/// batch and [`FactoryError::ReentrantCall`] when called back from inside
/// a guarded call.
#[utoipa::path(
    post,
    path = "/api/v1/batch/claim",
    tag = "Batches",
    summary = "Batch claim rewards",
    request_body = ClaimBatchRequest,
    responses(
        (status = 200, description = "Batch dispatched", body = BatchResponse),
        (status = 400, description = "Empty, over-long or malformed batch", body = ErrorResponse),
        (status = 409, description = "Re-entrant call from a collaborator", body = ErrorResponse),
    )
)]
pub async fn batch_claim_rewards(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ClaimBatchRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let pools = parse_pools(&req.pools)?;
    let report = state.factory.batch_claim_rewards(&pools).await?;
    Ok(Json(BatchResponse::from(report.receipt())))
}

/// `POST /batch/claim-for`: Claim rewards on behalf of a beneficiary.
///
/// # Errors
///
/// Same as [`batch_claim_rewards`].
#[utoipa::path(
    post,
    path = "/api/v1/batch/claim-for",
    tag = "Batches",
    summary = "Batch claim rewards for a beneficiary",
    request_body = ClaimForBatchRequest,
    responses(
        (status = 200, description = "Batch dispatched", body = BatchResponse),
        (status = 400, description = "Empty, over-long or malformed batch", body = ErrorResponse),
        (status = 409, description = "Re-entrant call from a collaborator", body = ErrorResponse),
    )
)]
pub async fn batch_claim_rewards_for(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ClaimForBatchRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let pools = parse_pools(&req.pools)?;
    let beneficiary = parse_address("beneficiary", &req.beneficiary)?;
    let report = state
        .factory
        .batch_claim_rewards_for(&pools, beneficiary)
        .await?;
    Ok(Json(BatchResponse::from(report.receipt())))
}

/// `POST /batch/emergency-unstake`: Pull staked items back to the owner.
///
/// # Errors
///
/// Returns [`FactoryError::Unauthorized`], [`FactoryError::InvalidArgument`]
/// on mismatched or over-long input, or [`FactoryError::ReentrantCall`].
#[utoipa::path(
    post,
    path = "/api/v1/batch/emergency-unstake",
    tag = "Batches",
    summary = "Emergency batch unstake",
    description = "Asks each pool to release one staked item to the administrative principal. Requires equal-length arrays of at most 10 entries.",
    request_body = UnstakeBatchRequest,
    params(("X-Caller" = String, Header, description = "Caller address")),
    responses(
        (status = 200, description = "Batch dispatched", body = BatchResponse),
        (status = 400, description = "Mismatched, over-long or malformed batch", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 409, description = "Re-entrant call from a collaborator", body = ErrorResponse),
    )
)]
pub async fn emergency_batch_unstake(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<UnstakeBatchRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let pools = parse_pools(&req.pools)?;
    let item_ids = req
        .item_ids
        .iter()
        .map(|raw| parse_amount("item_ids", raw))
        .collect::<Result<Vec<ItemId>, _>>()?;
    let report = state
        .factory
        .emergency_batch_unstake(caller, &pools, &item_ids)
        .await?;
    Ok(Json(BatchResponse::from(report.receipt())))
}

/// Batch routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batch/claim", post(batch_claim_rewards))
        .route("/batch/claim-for", post(batch_claim_rewards_for))
        .route("/batch/emergency-unstake", post(emergency_batch_unstake))
}
