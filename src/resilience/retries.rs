//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a fallible upstream call up to a fixed attempt ceiling
//! - Wait out the configured backoff between attempts
//! - Stop immediately on non-retryable errors
//! - Report every attempt and the final outcome to an [`AttemptObserver`]
//!
//! # Design Decisions
//! - Attempts are strictly sequential, never concurrent
//! - The last error is the one surfaced; intermediate failures only reach the observer
//! - 4xx validation-style failures short-circuit instead of burning the budget

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::RetryConfig;
use crate::error::GatewayResult;
use crate::observability::events::{AttemptFailure, AttemptObserver, AttemptRecord, RetryOutcome};
use crate::resilience::backoff::Backoff;

/// Attempt ceiling plus delay policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::new(1, Backoff::fixed(Duration::ZERO))
    }

    /// Longest a call can take when every attempt runs into `attempt_timeout`
    /// and every wait hits its backoff ceiling.
    pub fn worst_case(&self, attempt_timeout: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        let waits: Duration = (1..attempts).map(|n| self.backoff.ceiling(n)).sum();
        attempt_timeout.saturating_mul(attempts).saturating_add(waits)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Backoff::from(config))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt ceiling is reached.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    context: Option<&str>,
    observer: &dyn AttemptObserver,
    mut op: F,
) -> GatewayResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let started = Instant::now();
        let result = op(attempt).await;
        let elapsed = started.elapsed();

        let err = match result {
            Ok(value) => {
                observer.on_attempt(&AttemptRecord {
                    operation: operation.to_string(),
                    context: context.map(str::to_string),
                    attempt,
                    max_attempts,
                    elapsed,
                    error: None,
                    next_delay: None,
                });
                observer.on_outcome(operation, context, RetryOutcome::Succeeded { attempts: attempt });
                return Ok(value);
            }
            Err(err) => err,
        };

        let retryable = err.is_retryable();
        let next_delay = if retryable && attempt < max_attempts {
            Some(policy.backoff.delay(attempt))
        } else {
            None
        };

        observer.on_attempt(&AttemptRecord {
            operation: operation.to_string(),
            context: context.map(str::to_string),
            attempt,
            max_attempts,
            elapsed,
            error: Some(AttemptFailure::from(&err)),
            next_delay,
        });

        match next_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => {
                let outcome = if retryable {
                    RetryOutcome::GaveUp { attempts: attempt }
                } else {
                    RetryOutcome::ShortCircuited { attempts: attempt }
                };
                observer.on_outcome(operation, context, outcome);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::observability::events::RecordingObserver;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::fixed(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_exhausts_ceiling_and_returns_last_error() {
        let observer = RecordingObserver::new();
        let calls = AtomicU32::new(0);

        let result: GatewayResult<()> = retry(&fast_policy(4), "llm.completion", None, &observer, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(GatewayError::upstream_http("llm", 503, format!("attempt {attempt}"))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result.unwrap_err() {
            GatewayError::UpstreamHttp { body, .. } => assert_eq!(body, "attempt 4"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(observer.attempts().len(), 4);
        assert_eq!(
            observer.outcomes(),
            vec![("llm.completion".to_string(), RetryOutcome::GaveUp { attempts: 4 })]
        );
        assert!(observer.attempts().last().unwrap().next_delay.is_none());
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let observer = RecordingObserver::new();
        let calls = AtomicU32::new(0);

        let result = retry(&fast_policy(5), "llm.completion", Some("req-1"), &observer, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(GatewayError::timeout("late", Duration::from_millis(1)))
                } else {
                    Ok(attempt * 10)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let attempts = observer.attempts();
        assert_eq!(attempts.len(), 3);
        assert!(attempts[2].error.is_none());
        assert_eq!(attempts[0].context.as_deref(), Some("req-1"));
        assert_eq!(attempts[0].next_delay, Some(Duration::from_millis(1)));
    }

    #[tokio::test]
    async fn test_non_retryable_short_circuits() {
        let observer = RecordingObserver::new();
        let calls = AtomicU32::new(0);

        let result: GatewayResult<()> = retry(&fast_policy(5), "scopestack.me", None, &observer, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::upstream_http("scopestack", 401, "bad token")) }
        })
        .await;

        assert_eq!(result.unwrap_err().upstream_status(), Some(401));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observer.outcomes()[0].1, RetryOutcome::ShortCircuited { attempts: 1 });
    }

    #[tokio::test]
    async fn test_zero_ceiling_still_attempts_once() {
        let observer = RecordingObserver::new();
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff: Backoff::fixed(Duration::ZERO),
        };
        let calls = AtomicU32::new(0);

        let result = retry(&policy, "op", None, &observer, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok("done") }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_worst_case_adds_attempts_and_waits() {
        let policy = RetryPolicy::new(
            3,
            Backoff::exponential(Duration::from_millis(100), Duration::from_millis(1000)),
        );
        // 3 x 500ms + 110ms + 220ms
        assert_eq!(policy.worst_case(Duration::from_millis(500)), Duration::from_millis(1830));
        assert_eq!(RetryPolicy::once().worst_case(Duration::from_secs(2)), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_waits_backoff_between_attempts() {
        let observer = RecordingObserver::new();
        let policy = RetryPolicy::new(3, Backoff::fixed(Duration::from_millis(30)));
        let started = Instant::now();

        let _: GatewayResult<()> = retry(&policy, "op", None, &observer, |_| async {
            Err(GatewayError::timeout("late", Duration::ZERO))
        })
        .await;

        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
