//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!     → events.rs (retry attempt/outcome hook, injected into handlers)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) flows through every handler log line
//! - Retry diagnostics go through a trait object so tests can record them
//! - Metrics are cheap no-ops until a recorder is installed

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{AttemptObserver, RecordingObserver, RetryOutcome, TracingObserver};
