//! Shared DTO types and parsing helpers used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Address, CollectionId, PoolEndpointId};
use crate::error::FactoryError;

/// Range query parameters for `GET /pools/range`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeParams {
    /// Inclusive start position.
    pub start: usize,
    /// Exclusive end position.
    pub end: usize,
}

/// Limit query parameter for `GET /events`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsParams {
    /// Maximum number of events returned (newest last). Defaults to 100.
    #[serde(default = "default_event_limit")]
    pub limit: usize,
}

const fn default_event_limit() -> usize {
    100
}

/// Single address request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressRequest {
    /// Hex-encoded principal address.
    pub address: String,
}

/// Generic boolean answer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExistsResponse {
    /// Whether the queried entry exists.
    pub exists: bool,
}

/// Parses a hex address field, mapping failures to `InvalidArgument`.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] naming `field` when `raw` is
/// not a 20-byte hex string.
pub fn parse_address(field: &str, raw: &str) -> Result<Address, FactoryError> {
    raw.parse::<Address>()
        .map_err(|e| FactoryError::InvalidArgument(format!("{field}: {e}")))
}

/// Parses a collection identifier field.
///
/// # Errors
///
/// See [`parse_address`].
pub fn parse_collection(field: &str, raw: &str) -> Result<CollectionId, FactoryError> {
    parse_address(field, raw).map(CollectionId::from)
}

/// Parses a pool endpoint identifier field.
///
/// # Errors
///
/// See [`parse_address`].
pub fn parse_endpoint(field: &str, raw: &str) -> Result<PoolEndpointId, FactoryError> {
    parse_address(field, raw).map(PoolEndpointId::from)
}

/// Parses a string-encoded `u128` amount field.
///
/// # Errors
///
/// Returns [`FactoryError::InvalidArgument`] when `raw` is not a decimal
/// `u128`.
pub fn parse_amount(field: &str, raw: &str) -> Result<u128, FactoryError> {
    raw.parse::<u128>()
        .map_err(|e| FactoryError::InvalidArgument(format!("{field}: {e}")))
}
