//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, deadline, body limit, metrics)
//! - Build the shared application state from configuration
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::middleware::{enforce_deadline, track_metrics};
use crate::observability::events::{AttemptObserver, TracingObserver};
use crate::upstream::{LlmClient, ScopeStackClient, UpstreamClient};

/// Application state injected into handlers.
///
/// Read-only after construction; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub llm: LlmClient,
    pub scopestack: ScopeStackClient,
}

impl AppState {
    pub fn new(config: GatewayConfig, observer: Arc<dyn AttemptObserver>) -> Self {
        let upstream = UpstreamClient::from_config(&config, observer);
        Self {
            llm: LlmClient::new(upstream.clone(), config.llm.clone()),
            scopestack: ScopeStackClient::new(upstream, config.scopestack.clone()),
            config: Arc::new(config),
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl GatewayServer {
    /// Create a server that reports upstream attempts through `tracing`.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Create a server with a custom attempt observer.
    pub fn with_observer(config: GatewayConfig, observer: Arc<dyn AttemptObserver>) -> Self {
        let state = AppState::new(config, observer);
        let config = state.config.clone();
        let router = build_router(&config, state);
        Self { router, config }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires (or its sender is dropped).
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// The body limit is enforced by the body extractors, so over-limit bodies
/// get the gateway's JSON error shape.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let deadline = Duration::from_secs(config.timeouts.request_secs);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/completion", post(handlers::completion))
        .route("/api/scopestack/account", get(handlers::account))
        .route("/api/generate", post(handlers::generate))
        .with_state(state)
        .layer(middleware::from_fn(track_metrics))
        .layer(DefaultBodyLimit::max(config.security.max_body_size))
        .layer(middleware::from_fn_with_state(deadline, enforce_deadline))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
