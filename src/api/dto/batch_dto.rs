//! Batch fan-out DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::BatchReceipt;

/// Request body for `POST /batch/claim`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimBatchRequest {
    /// Hex-encoded pool endpoint addresses (1..=20).
    pub pools: Vec<String>,
}

/// Request body for `POST /batch/claim-for`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimForBatchRequest {
    /// Hex-encoded pool endpoint addresses (1..=20).
    pub pools: Vec<String>,
    /// Hex-encoded beneficiary receiving the rewards.
    pub beneficiary: String,
}

/// Request body for `POST /batch/emergency-unstake`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnstakeBatchRequest {
    /// Hex-encoded pool endpoint addresses (at most 10).
    pub pools: Vec<String>,
    /// Staked item IDs, string-encoded u128, aligned with `pools`.
    pub item_ids: Vec<String>,
}

/// Response body for every batch operation.
///
/// Per-target failures are not reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    /// Operation name.
    pub operation: String,
    /// Number of targets attempted.
    pub attempted: usize,
}

impl From<BatchReceipt> for BatchResponse {
    fn from(receipt: BatchReceipt) -> Self {
        Self {
            operation: receipt.operation.to_string(),
            attempted: receipt.attempted,
        }
    }
}
