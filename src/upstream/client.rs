//! Shared outbound HTTP plumbing.
//!
//! # Responsibilities
//! - Send a single request and classify the result
//! - Wrap each attempt in the upstream deadline
//! - Drive attempts through the retry wrapper with the injected observer

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::observability::events::AttemptObserver;
use crate::resilience::{retry, with_timeout, RetryPolicy};

/// Outbound client shared by every upstream integration.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    observer: Arc<dyn AttemptObserver>,
}

impl UpstreamClient {
    pub fn new(
        http: reqwest::Client,
        policy: RetryPolicy,
        attempt_timeout: Duration,
        observer: Arc<dyn AttemptObserver>,
    ) -> Self {
        Self {
            http,
            policy,
            attempt_timeout,
            observer,
        }
    }

    /// Build from configuration with a fresh connection pool.
    pub fn from_config(config: &GatewayConfig, observer: Arc<dyn AttemptObserver>) -> Self {
        Self::new(
            reqwest::Client::new(),
            RetryPolicy::from(&config.retries),
            Duration::from_millis(config.timeouts.upstream_ms),
            observer,
        )
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deadline applied to each attempt.
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Run `op` with a per-attempt deadline under the retry policy.
    ///
    /// `context` tags every attempt record, typically with the request ID.
    pub async fn call<T, F, Fut>(&self, operation: &str, context: Option<&str>, mut op: F) -> GatewayResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let timeout = self.attempt_timeout;
        retry(&self.policy, operation, context, self.observer.as_ref(), |attempt| {
            with_timeout(
                timeout,
                format!("{} timed out after {}ms", operation, timeout.as_millis()),
                op(attempt),
            )
        })
        .await
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("policy", &self.policy)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

fn transport_error(service: &str, deadline: Duration, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(
            format!("{service} request timed out after {}ms", deadline.as_millis()),
            deadline,
        )
    } else {
        GatewayError::upstream(service, err.to_string())
    }
}

/// Send one request and decode a 2xx JSON body into `T`.
///
/// `deadline` is the budget the request runs under, reported if reqwest
/// itself gives up. Non-2xx responses keep the raw body text for diagnostics.
pub async fn send_json<T: DeserializeOwned>(
    service: &str,
    request: reqwest::RequestBuilder,
    deadline: Duration,
) -> GatewayResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(service, deadline, e))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(service, deadline, e))?;

    if !status.is_success() {
        return Err(GatewayError::upstream_http(service, status.as_u16(), text));
    }

    serde_json::from_str(&text).map_err(|e| {
        GatewayError::unknown(
            format!("unexpected {service} response shape"),
            Some(format!("{e}: {text}")),
        )
    })
}
