//! Backoff policies applied between retry attempts.

use std::time::Duration;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RetryConfig;

/// Shape of the delay curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// `base * 2^(attempt-1)`, capped at `max`.
    #[default]
    Exponential,
    /// Always `base`.
    Fixed,
}

/// Delay policy between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    pub kind: BackoffKind,
    pub base: Duration,
    pub max: Duration,
    pub jitter: bool,
}

impl Backoff {
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            kind: BackoffKind::Exponential,
            base,
            max,
            jitter: true,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            kind: BackoffKind::Fixed,
            base: delay,
            max: delay,
            jitter: false,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Longest delay `delay(attempt)` can return, jitter included.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        let delay = match self.kind {
            BackoffKind::Exponential => calculate_backoff(attempt, base_ms, max_ms, false),
            BackoffKind::Fixed => Duration::from_millis(base_ms),
        };
        if self.jitter {
            delay + delay / 10
        } else {
            delay
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        match self.kind {
            BackoffKind::Exponential => calculate_backoff(attempt, base_ms, max_ms, self.jitter),
            BackoffKind::Fixed => with_jitter(base_ms, self.jitter),
        }
    }
}

impl From<&RetryConfig> for Backoff {
    fn from(config: &RetryConfig) -> Self {
        Self {
            kind: config.backoff,
            base: Duration::from_millis(config.base_delay_ms),
            max: Duration::from_millis(config.max_delay_ms.max(config.base_delay_ms)),
            jitter: config.jitter,
        }
    }
}

/// Calculate exponential backoff delay, optionally with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter: bool) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    with_jitter(capped_delay, jitter)
}

/// Apply jitter (0 to 10% of the delay).
fn with_jitter(delay_ms: u64, jitter: bool) -> Duration {
    let jitter_range = delay_ms / 10;
    let extra = if jitter && jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + extra)
}
