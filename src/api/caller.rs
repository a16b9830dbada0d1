//! Caller identity extractor.
//!
//! Every mutating request names its caller in the `X-Caller` header as a
//! hex address. The factory trusts this identity as-is; authentication of
//! the header is the job of the deployment in front of the service.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::Address;
use crate::error::FactoryError;

/// Header carrying the caller's address.
pub const CALLER_HEADER: &str = "x-caller";

/// The principal issuing the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Address);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = FactoryError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| FactoryError::InvalidArgument("missing X-Caller header".to_string()))?
            .to_str()
            .map_err(|_| FactoryError::InvalidArgument("X-Caller is not ASCII".to_string()))?;
        let address = raw
            .trim()
            .parse::<Address>()
            .map_err(|e| FactoryError::InvalidArgument(format!("X-Caller: {e}")))?;
        Ok(Self(address))
    }
}
