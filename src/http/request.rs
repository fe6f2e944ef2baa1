//! Request extraction.
//!
//! # Responsibilities
//! - Expose the request ID assigned by the request-ID layer
//! - Decode and validate JSON bodies once, at the boundary
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body problems become `Validation` errors with the gateway's JSON error shape,
//!   not axum's plain-text rejections

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
};
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::validation::{decode, RequestSchema};

pub const X_REQUEST_ID: &str = "x-request-id";

/// The request's `x-request-id`, or `"unknown"` when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        Ok(RequestId(id))
    }
}

/// JSON body validated against `T`'s field contract.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

/// Parse raw body bytes; an empty body reads as `{}`.
pub fn parse_body(bytes: &[u8]) -> Result<Value, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| GatewayError::validation(format!("Invalid JSON body: {e}")))
}

fn body_rejection(rejection: BytesRejection) -> GatewayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge
    } else {
        GatewayError::validation(format!("Unreadable request body: {}", rejection.body_text()))
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: RequestSchema + Send,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(body_rejection)?;
        let value = parse_body(&bytes)?;
        decode(&value).map(ValidatedJson)
    }
}
