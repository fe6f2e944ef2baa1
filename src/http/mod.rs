//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout, body limit)
//!     → request.rs (request ID extractor, ValidatedJson body decoding)
//!     → handlers.rs (call upstream through the resilience wrappers)
//!     → JSON response, or sse.rs events for streaming routes
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;
pub mod sse;
pub mod types;

pub use request::{RequestId, ValidatedJson, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
pub use sse::{SseDecoder, StepStatus, StreamEvent};
