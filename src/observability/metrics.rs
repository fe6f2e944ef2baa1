//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): handled requests by route, status
//! - `gateway_request_duration_seconds` (histogram): handler latency
//! - `gateway_upstream_attempts_total` (counter): upstream attempts by operation, result
//! - `gateway_upstream_calls_total` (counter): retried calls by operation, outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished inbound request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("gateway_requests_total", "route" => route.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Record one upstream attempt; `result` is "success" or an error kind.
pub fn record_attempt(operation: &str, result: &str) {
    counter!(
        "gateway_upstream_attempts_total",
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record how a retried upstream call ended.
pub fn record_retry_outcome(operation: &str, outcome: &str) {
    counter!(
        "gateway_upstream_calls_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
