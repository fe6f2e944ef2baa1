//! Attempt and outcome events emitted by the retry wrapper.
//!
//! The retry loop reports through an injected [`AttemptObserver`] rather than
//! logging directly, so behavior can be asserted in tests without capturing
//! process output.

use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ErrorKind, GatewayError};
use crate::observability::metrics;

/// One finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub operation: String,
    pub context: Option<String>,
    pub attempt: u32,
    pub max_attempts: u32,
    pub elapsed: Duration,
    /// `None` on success.
    pub error: Option<AttemptFailure>,
    /// Delay before the next attempt, if one will be made.
    pub next_delay: Option<Duration>,
}

/// Summary of a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// Transport or upstream-body detail, for logs only.
    pub detail: Option<String>,
    pub retryable: bool,
}

impl From<&GatewayError> for AttemptFailure {
    fn from(err: &GatewayError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            detail: err.detail().map(str::to_string),
            retryable: err.is_retryable(),
        }
    }
}

/// How a retried call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { attempts: u32 },
    /// Every attempt failed with a retryable error.
    GaveUp { attempts: u32 },
    /// A non-retryable error stopped the loop early.
    ShortCircuited { attempts: u32 },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            RetryOutcome::Succeeded { attempts }
            | RetryOutcome::GaveUp { attempts }
            | RetryOutcome::ShortCircuited { attempts } => attempts,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RetryOutcome::Succeeded { .. } => "succeeded",
            RetryOutcome::GaveUp { .. } => "gave_up",
            RetryOutcome::ShortCircuited { .. } => "short_circuited",
        }
    }
}

/// Sink for retry diagnostics, keyed by operation name.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, record: &AttemptRecord);

    fn on_outcome(&self, operation: &str, context: Option<&str>, outcome: RetryOutcome);
}

/// Production observer: structured `tracing` events plus metrics counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, record: &AttemptRecord) {
        match &record.error {
            None => {
                tracing::debug!(
                    operation = %record.operation,
                    context = ?record.context,
                    attempt = record.attempt,
                    max_attempts = record.max_attempts,
                    elapsed_ms = record.elapsed.as_millis() as u64,
                    "Upstream attempt succeeded"
                );
                metrics::record_attempt(&record.operation, "success");
            }
            Some(failure) => {
                tracing::warn!(
                    operation = %record.operation,
                    context = ?record.context,
                    attempt = record.attempt,
                    max_attempts = record.max_attempts,
                    elapsed_ms = record.elapsed.as_millis() as u64,
                    kind = %failure.kind,
                    retryable = failure.retryable,
                    delay = ?record.next_delay,
                    error = %failure.message,
                    detail = ?failure.detail,
                    "Upstream attempt failed"
                );
                metrics::record_attempt(&record.operation, failure.kind.as_str());
            }
        }
    }

    fn on_outcome(&self, operation: &str, context: Option<&str>, outcome: RetryOutcome) {
        match outcome {
            RetryOutcome::Succeeded { attempts } => {
                tracing::info!(operation = %operation, context = ?context, attempts, "Upstream call succeeded");
            }
            RetryOutcome::GaveUp { attempts } => {
                tracing::error!(operation = %operation, context = ?context, attempts, "Upstream call failed, retries exhausted");
            }
            RetryOutcome::ShortCircuited { attempts } => {
                tracing::warn!(operation = %operation, context = ?context, attempts, "Upstream call failed with non-retryable error");
            }
        }
        metrics::record_retry_outcome(operation, outcome.label());
    }
}

/// Observer that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    attempts: Mutex<Vec<AttemptRecord>>,
    outcomes: Mutex<Vec<(String, RetryOutcome)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn outcomes(&self) -> Vec<(String, RetryOutcome)> {
        self.outcomes.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Attempts recorded for one operation name.
    pub fn attempts_for(&self, operation: &str) -> Vec<AttemptRecord> {
        self.attempts()
            .into_iter()
            .filter(|r| r.operation == operation)
            .collect()
    }
}

impl AttemptObserver for RecordingObserver {
    fn on_attempt(&self, record: &AttemptRecord) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(record.clone());
        }
    }

    fn on_outcome(&self, operation: &str, _context: Option<&str>, outcome: RetryOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push((operation.to_string(), outcome));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_filters_by_operation() {
        let observer = RecordingObserver::new();
        for (op, attempt) in [("llm.completion", 1), ("scopestack.me", 1), ("llm.completion", 2)] {
            observer.on_attempt(&AttemptRecord {
                operation: op.to_string(),
                context: None,
                attempt,
                max_attempts: 3,
                elapsed: Duration::ZERO,
                error: None,
                next_delay: None,
            });
        }
        observer.on_outcome("llm.completion", None, RetryOutcome::Succeeded { attempts: 2 });

        assert_eq!(observer.attempts().len(), 3);
        assert_eq!(observer.attempts_for("llm.completion").len(), 2);
        assert_eq!(observer.outcomes()[0].1.attempts(), 2);
    }

    #[test]
    fn test_failure_summary_from_error() {
        let failure = AttemptFailure::from(&GatewayError::upstream_http("llm", 503, "down"));
        assert_eq!(failure.kind, ErrorKind::UpstreamHttp);
        assert!(failure.retryable);
        assert_eq!(failure.message, "llm returned HTTP 503");
    }
}
