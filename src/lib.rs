//! Scope Gateway Library
//!
//! HTTP gateway in front of a chat-completion API and the ScopeStack API.
//! Every upstream call goes through a per-attempt timeout and a bounded
//! retry loop, and every failure is a typed [`GatewayError`].

pub mod config;
pub mod error;
pub mod generation;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;
pub mod validation;

pub use config::GatewayConfig;
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
