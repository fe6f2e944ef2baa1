//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Check that addresses and upstream URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Missing secrets are not errors here; they fail per request

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::resilience::RetryPolicy;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_ms == 0 {
        errors.push(ValidationError::new("timeouts.upstream_ms", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must not be smaller than base_delay_ms",
        ));
    }

    if config.timeouts.request_secs > 0 && config.timeouts.upstream_ms > 0 {
        let budget = Duration::from_secs(config.timeouts.request_secs);
        let worst_case = RetryPolicy::from(&config.retries)
            .worst_case(Duration::from_millis(config.timeouts.upstream_ms));
        if budget < worst_case {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!(
                    "{}s is shorter than the worst-case upstream retry schedule ({}ms)",
                    config.timeouts.request_secs,
                    worst_case.as_millis()
                ),
            ));
        }
    }

    check_url(&mut errors, "llm.base_url", &config.llm.base_url);
    check_url(&mut errors, "scopestack.base_url", &config.scopestack.base_url);

    if config.llm.default_model.trim().is_empty() {
        errors.push(ValidationError::new("llm.default_model", "must not be empty"));
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        errors.push(ValidationError::new("llm.temperature", "must be between 0.0 and 2.0"));
    }
    if config.llm.max_tokens == 0 {
        errors.push(ValidationError::new("llm.max_tokens", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
