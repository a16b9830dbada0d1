//! Pool directory DTOs: registration, creation, lookups and ownership.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PoolEndpointId, PoolInfo};

/// Request body for `POST /pools`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterPoolRequest {
    /// Hex-encoded NFT collection address.
    pub collection: String,
    /// Hex-encoded staking pool endpoint address.
    pub pool: String,
}

/// Request body for `POST /pools/create`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePoolRequest {
    /// Hex-encoded NFT collection address.
    pub collection: String,
    /// Hex-encoded receipt token address.
    pub receipt: String,
    /// Hex-encoded central reward pool address.
    pub central_pool: String,
    /// Creation fee (string-encoded u128).
    #[serde(default = "zero_amount")]
    pub fee_amount: String,
    /// Percentage of rewards routed to the central pool (0..=100).
    pub central_share: u32,
}

fn zero_amount() -> String {
    "0".to_string()
}

/// Response body for endpoint list queries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolListResponse {
    /// Endpoint addresses in directory order.
    pub pools: Vec<String>,
}

impl PoolListResponse {
    /// Builds the response from directory endpoints.
    #[must_use]
    pub fn from_endpoints(pools: &[PoolEndpointId]) -> Self {
        Self {
            pools: pools.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Response body for `GET /pools/count`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolCountResponse {
    /// Number of registered collections.
    pub count: usize,
}

/// Response body for `GET /collections/{id}/pool`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolAddressResponse {
    /// Registered endpoint, or the zero address when absent.
    pub pool: String,
}

/// Response body for `GET /collections/{id}/info`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolInfoResponse {
    /// Registered endpoint, or the zero address when absent.
    pub pool: String,
    /// Whether the collection is registered.
    pub exists: bool,
}

impl From<PoolInfo> for PoolInfoResponse {
    fn from(info: PoolInfo) -> Self {
        Self {
            pool: info.pool.to_string(),
            exists: info.exists,
        }
    }
}

/// Request body for `POST /pools/info`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MultiPoolInfoRequest {
    /// Hex-encoded collection addresses.
    pub collections: Vec<String>,
}

/// Response body for `POST /pools/info`: two arrays aligned with the
/// request order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MultiPoolInfoResponse {
    /// Endpoint per collection, zero address when absent.
    pub pools: Vec<String>,
    /// Registration flag per collection.
    pub exists: Vec<bool>,
}

impl MultiPoolInfoResponse {
    /// Splits lookup results into aligned arrays.
    #[must_use]
    pub fn from_infos(infos: &[PoolInfo]) -> Self {
        Self {
            pools: infos.iter().map(|i| i.pool.to_string()).collect(),
            exists: infos.iter().map(|i| i.exists).collect(),
        }
    }
}

/// Request body for `POST /collections/{id}/owner`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferPoolOwnershipRequest {
    /// Hex-encoded new owner of the pool endpoint.
    pub new_owner: String,
}

/// Response body for `GET /owner`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnerResponse {
    /// Current administrative principal (zero address once renounced).
    pub owner: String,
}
