//! Third-party API integrations.
//!
//! # Data Flow
//! ```text
//! handler
//!     → llm.rs / scopestack.rs (build request from config, secrets checked first)
//!     → client.rs (retry → per-attempt timeout → send_json)
//!     → typed response or GatewayError
//! ```
//!
//! # Design Decisions
//! - Secrets are checked before the first attempt; a missing key never reaches the network
//! - Non-2xx bodies are kept verbatim inside the error for logging
//! - One reqwest connection pool shared by all integrations

pub mod client;
pub mod llm;
pub mod scopestack;

pub use client::UpstreamClient;
pub use llm::{Completion, LlmClient};
pub use scopestack::{Resource, ScopeStackClient};
