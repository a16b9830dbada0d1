//! Held-value handlers: balance, deposit, emergency withdraw.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::caller::Caller;
use crate::api::dto::{
    BalanceResponse, DepositRequest, WithdrawRequest, WithdrawResponse, parse_address,
    parse_amount,
};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, FactoryError};

/// `GET /funds`: Held balance.
#[utoipa::path(
    get,
    path = "/api/v1/funds",
    tag = "Funds",
    summary = "Get the held balance",
    responses(
        (status = 200, description = "Held balance", body = BalanceResponse),
    )
)]
pub async fn get_balance(State(state): State<AppState>) -> impl IntoResponse {
    Json(BalanceResponse {
        balance: state.factory.balance().await.to_string(),
    })
}

/// `POST /funds/deposit`: Accept unsolicited value from the caller.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] on a malformed amount or
/// balance overflow.
#[utoipa::path(
    post,
    path = "/api/v1/funds/deposit",
    tag = "Funds",
    summary = "Deposit value",
    request_body = DepositRequest,
    params(("X-Caller" = String, Header, description = "Sender address")),
    responses(
        (status = 200, description = "New balance", body = BalanceResponse),
        (status = 400, description = "Malformed amount", body = ErrorResponse),
    )
)]
pub async fn deposit(
    State(state): State<AppState>,
    Caller(sender): Caller,
    ApiJson(req): ApiJson<DepositRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let amount = parse_amount("amount", &req.amount)?;
    let balance = state.factory.receive(sender, amount).await?;
    Ok(Json(BalanceResponse {
        balance: balance.to_string(),
    }))
}

/// `POST /funds/withdraw`: Sweep held value to a destination.
///
/// # Errors
///
/// Returns [`FactoryError`] on authorization failure, a zero destination,
/// insufficient funds, a re-entrant call or a rejected transfer.
#[utoipa::path(
    post,
    path = "/api/v1/funds/withdraw",
    tag = "Funds",
    summary = "Emergency withdraw",
    description = "Transfers `amount` (or the whole balance when omitted or zero) to `destination`.",
    request_body = WithdrawRequest,
    params(("X-Caller" = String, Header, description = "Caller address")),
    responses(
        (status = 200, description = "Amount transferred", body = WithdrawResponse),
        (status = 400, description = "Zero or malformed destination", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 409, description = "Re-entrant call from a collaborator", body = ErrorResponse),
        (status = 422, description = "Insufficient funds", body = ErrorResponse),
        (status = 502, description = "Recipient rejected the transfer", body = ErrorResponse),
    )
)]
pub async fn withdraw(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<WithdrawRequest>,
) -> Result<impl IntoResponse, FactoryError> {
    let destination = parse_address("destination", &req.destination)?;
    let amount = req
        .amount
        .as_deref()
        .map_or(Ok(0), |raw| parse_amount("amount", raw))?;
    let sent = state
        .factory
        .emergency_withdraw(caller, destination, amount)
        .await?;
    let remaining = state.factory.balance().await;
    Ok(Json(WithdrawResponse {
        amount: sent.to_string(),
        remaining: remaining.to_string(),
    }))
}

/// Funds routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/funds", get(get_balance))
        .route("/funds/deposit", post(deposit))
        .route("/funds/withdraw", post(withdraw))
}
