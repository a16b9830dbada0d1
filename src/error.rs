//! Factory error types with HTTP status code mapping.
//!
//! [`FactoryError`] is the central error type. Each variant maps to a
//! stable numeric code and an HTTP status code, and renders as a structured
//! JSON error response. Failures reported by external collaborators are
//! modeled separately as [`EndpointError`] so the batch dispatcher can
//! record them without propagating.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Address, CollectionId, PoolEndpointId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "pool already registered for collection 0x…",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                       |
/// |-----------|---------------------|-----------------------------------|
/// | 1000–1999 | Authorization/Input | 403 Forbidden / 400 Bad Request   |
/// | 2000–2999 | Directory state     | 404 Not Found / 409 Conflict      |
/// | 3000–3999 | Server              | 500 / 501 / 502                   |
/// | 4000–4999 | Collaborator/Funds  | 422 Unprocessable Entity          |
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// Caller is not the administrative principal.
    #[error("unauthorized caller: {0}")]
    Unauthorized(Address),

    /// Zero sentinel, malformed range, length mismatch or over-length batch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The collection already has a registered pool.
    #[error("pool already registered for collection {0}")]
    AlreadyExists(CollectionId),

    /// The collection has no registered pool.
    #[error("no pool registered for collection {0}")]
    NotFound(CollectionId),

    /// The endpoint does not reference a deployed, executable component.
    #[error("invalid pool endpoint: {0}")]
    InvalidEndpoint(PoolEndpointId),

    /// The collection is missing or fails the capability probe.
    #[error("invalid collection: {0}")]
    InvalidCollection(CollectionId),

    /// Central share outside `0..=100`.
    #[error("central share {0} outside 0..=100")]
    InvalidShareRange(u32),

    /// Held balance is zero or smaller than the requested amount.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Requested amount (0 means "everything").
        requested: u128,
        /// Held balance.
        available: u128,
    },

    /// An outbound transfer was rejected by its recipient.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// A collaborator called back into a guarded entry point from inside a
    /// guarded call.
    #[error("reentrant call rejected")]
    ReentrantCall,

    /// The operation validated successfully but is deliberately disabled.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FactoryError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Unauthorized(_) => 1000,
            Self::InvalidArgument(_) => 1001,
            Self::InvalidShareRange(_) => 1002,
            Self::NotFound(_) => 2001,
            Self::AlreadyExists(_) => 2002,
            Self::ReentrantCall => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::NotImplemented(_) => 3002,
            Self::TransferFailed(_) => 3003,
            Self::InvalidEndpoint(_) => 4001,
            Self::InvalidCollection(_) => 4002,
            Self::InsufficientFunds { .. } => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) | Self::InvalidShareRange(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) | Self::ReentrantCall => StatusCode::CONFLICT,
            Self::InvalidEndpoint(_)
            | Self::InvalidCollection(_)
            | Self::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TransferFailed(_) => StatusCode::BAD_GATEWAY,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FactoryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure reported by an external collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// The callee reverted / rejected the call.
    #[error("call reverted: {0}")]
    Reverted(String),

    /// No executable component exists at the target identity.
    #[error("no code at {0}")]
    NoCode(Address),

    /// Code exists at the target identity but does not expose the pool
    /// endpoint interface.
    #[error("no pool endpoint interface at {0}")]
    Unresolvable(Address),

    /// The callee tried to re-enter the factory and was refused.
    #[error("reentrancy refused")]
    Reentrancy,
}
