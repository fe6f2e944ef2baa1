//! Scope Gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                    SCOPE GATEWAY                      │
//!                         │                                                       │
//!     Client Request      │  ┌──────────┐   ┌────────────┐   ┌────────────────┐  │
//!     ────────────────────┼─▶│  http    │──▶│ validation │──▶│   handlers     │  │
//!                         │  │ server   │   │ (contract) │   │                │  │
//!                         │  └──────────┘   └────────────┘   └───────┬────────┘  │
//!                         │                                          │           │
//!                         │                                          ▼           │
//!                         │                                  ┌────────────────┐  │
//!                         │                                  │  resilience    │  │
//!                         │                                  │ retry/timeout  │  │
//!                         │                                  └───────┬────────┘  │
//!                         │                                          │           │
//!     Client Response     │  ┌──────────┐   ┌────────────┐   ┌───────▼────────┐  │
//!     ◀───────────────────┼──│ JSON or  │◀──│   error    │◀──│   upstream     │◀─┼── LLM API /
//!                         │  │ SSE body │   │  mapping   │   │   clients      │  │   ScopeStack
//!                         │  └──────────┘   └────────────┘   └────────────────┘  │
//!                         │                                                       │
//!                         │   config · observability (logs, metrics) · lifecycle  │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use scope_gateway::config::loader::load_from_process_env;
use scope_gateway::lifecycle::{shutdown_signal, Shutdown};
use scope_gateway::observability::{logging, metrics};
use scope_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "scope-gateway")]
#[command(about = "HTTP gateway for LLM completions and ScopeStack", long_about = None)]
struct Args {
    /// TOML configuration file (defaults to $GATEWAY_CONFIG, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var_os("GATEWAY_CONFIG").map(PathBuf::from));

    let config = load_from_process_env(config_path.as_deref())?;

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("scope-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        config_file = ?config_path,
        upstream_timeout_ms = config.timeouts.upstream_ms,
        max_attempts = config.retries.max_attempts,
        backoff = ?config.retries.backoff,
        llm_key_present = config.llm.api_key.is_some(),
        scopestack_token_present = config.scopestack.api_token.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on(shutdown_signal());

    let server = GatewayServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
