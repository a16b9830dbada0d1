//! Held-value DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `GET /funds`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// Held balance (string-encoded u128).
    pub balance: String,
}

/// Request body for `POST /funds/deposit`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositRequest {
    /// Amount sent with the call (string-encoded u128).
    pub amount: String,
}

/// Request body for `POST /funds/withdraw`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    /// Hex-encoded recipient.
    pub destination: String,
    /// Amount to sweep (string-encoded u128). `"0"` sweeps everything.
    #[serde(default)]
    pub amount: Option<String>,
}

/// Response body for `POST /funds/withdraw`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawResponse {
    /// Amount actually transferred (string-encoded u128).
    pub amount: String,
    /// Balance left after the sweep (string-encoded u128).
    pub remaining: String,
}
