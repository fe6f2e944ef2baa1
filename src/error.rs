//! Structured gateway errors.
//!
//! Every failure a handler can hit is a [`GatewayError`]. Lower layers build
//! and propagate them; only the HTTP boundary turns one into a response, via
//! [`IntoResponse`].

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Configuration,
    UpstreamHttp,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::UpstreamHttp => "upstream_http",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while handling a gateway request.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Inbound body is missing fields or has the wrong shape.
    #[error("{message}")]
    Validation { message: String, fields: Vec<String> },

    /// Inbound body is larger than `security.max_body_size`.
    #[error("Request body exceeds the configured size limit")]
    PayloadTooLarge,

    /// A setting the request needs (usually a secret) is absent.
    #[error("Missing configuration: {setting}")]
    Configuration { setting: String },

    /// Upstream answered with a non-2xx status.
    #[error("{service} returned HTTP {status}")]
    UpstreamHttp {
        service: String,
        status: u16,
        body: String,
    },

    /// Upstream could not be reached (connect, reset, broken body).
    /// `detail` holds the transport error and is only logged.
    #[error("{service} is unreachable")]
    Upstream { service: String, detail: String },

    /// Deadline elapsed before the operation settled.
    #[error("{message}")]
    Timeout { message: String, after: Duration },

    /// Anything uncategorized. Never shown to callers verbatim.
    #[error("{message}")]
    Unknown {
        message: String,
        detail: Option<String>,
    },
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Validation failure that names the offending field(s).
    pub fn invalid_fields<I, S>(message: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            message: message.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn configuration(setting: impl Into<String>) -> Self {
        Self::Configuration {
            setting: setting.into(),
        }
    }

    /// Build an upstream error from a status code and the raw response text.
    pub fn upstream_http(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::UpstreamHttp {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    /// Transport-level failure; `detail` never reaches the caller.
    pub fn upstream(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            detail: detail.into(),
        }
    }

    pub fn timeout(message: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            message: message.into(),
            after,
        }
    }

    pub fn unknown(message: impl Into<String>, detail: Option<String>) -> Self {
        Self::Unknown {
            message: message.into(),
            detail,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation { .. } | GatewayError::PayloadTooLarge => ErrorKind::Validation,
            GatewayError::Configuration { .. } => ErrorKind::Configuration,
            GatewayError::UpstreamHttp { .. } | GatewayError::Upstream { .. } => {
                ErrorKind::UpstreamHttp
            }
            GatewayError::Timeout { .. } => ErrorKind::Timeout,
            GatewayError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Upstream status code, when the error came from a remote response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GatewayError::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnostic text kept out of caller-facing bodies.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Upstream { detail, .. } => Some(detail.as_str()),
            GatewayError::UpstreamHttp { body, .. } => Some(body.as_str()),
            GatewayError::Unknown { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// Timeouts, transport failures and 408/429/5xx are transient; everything
    /// else is a property of the request and fails the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Timeout { .. } | GatewayError::Upstream { .. } => true,
            GatewayError::UpstreamHttp { status, .. } => {
                matches!(*status, 408 | 429) || (500..600).contains(status)
            }
            GatewayError::Validation { .. }
            | GatewayError::PayloadTooLarge
            | GatewayError::Configuration { .. }
            | GatewayError::Unknown { .. } => false,
        }
    }

    /// HTTP status sent to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Configuration { .. } | GatewayError::Unknown { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::UpstreamHttp { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// JSON body sent to the caller.
    pub fn body(&self) -> ErrorBody {
        let error = match self {
            GatewayError::Unknown { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let fields = match self {
            GatewayError::Validation { fields, .. } => fields.clone(),
            _ => Vec::new(),
        };
        ErrorBody {
            error,
            code: self.kind(),
            status: self.upstream_status(),
            fields,
        }
    }
}

/// Wire shape of an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::Unknown { message, detail } => {
                tracing::error!(error = %message, detail = ?detail, "Unhandled gateway error");
            }
            GatewayError::UpstreamHttp { service, status, body } => {
                tracing::warn!(service = %service, status, body = %body, "Upstream error response");
            }
            GatewayError::Upstream { service, detail } => {
                tracing::warn!(service = %service, detail = %detail, "Upstream unreachable");
            }
            other => {
                tracing::debug!(kind = %other.kind(), error = %other, "Request failed");
            }
        }
        (self.status(), Json(self.body())).into_response()
    }
}
