//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call:
//!     → retries.rs (attempt loop, classify failures, observe attempts)
//!         → timeouts.rs (deadline around each single attempt)
//!     → on retryable failure: backoff.rs (delay before next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Only transient failures (timeouts, transport errors, 408/429/5xx) are retried
//! - Backoff policy comes from configuration, never hardcoded at call sites

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::{Backoff, BackoffKind};
pub use retries::{retry, RetryPolicy};
pub use timeouts::with_timeout;
