//! Timeout enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the timer is dropped with whichever side settles first
//! - On expiry the operation future is dropped, so its eventual result is never observed
//! - Timeout errors are distinct from other errors and map to 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

/// Race `operation` against a deadline.
///
/// Returns the operation's own result if it settles within `duration`,
/// otherwise [`GatewayError::Timeout`] carrying `message`.
pub async fn with_timeout<F, T>(
    duration: Duration,
    message: impl Into<String>,
    operation: F,
) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::timeout(message, duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_value_returned_before_deadline() {
        let result = with_timeout(Duration::from_millis(200), "slow", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_operation_error_passes_through() {
        let result: GatewayResult<()> = with_timeout(Duration::from_millis(200), "slow", async {
            Err(GatewayError::validation("nope"))
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_deadline_elapses_first() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let result: GatewayResult<()> = with_timeout(Duration::from_millis(20), "LLM call timed out", async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "LLM call timed out");

        // The abandoned operation never reports back.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_never_resolving_operation_times_out() {
        let result: GatewayResult<()> =
            with_timeout(Duration::from_millis(10), "hung", std::future::pending()).await;
        assert!(matches!(result, Err(GatewayError::Timeout { .. })));
    }
}
