//! Retry backoff policy and sleep abstraction.
//!
//! Delay computation is a pure function of (attempt, jitter) so timing is
//! testable without waiting; the [`Sleeper`] trait is the injection point
//! for the actual suspension.

use async_trait::async_trait;
use std::time::Duration;

/// Exponential backoff policy with a jittered, capped delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first one.
    pub max_attempts: u32,
    /// Upper bound on any single delay.
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            cap: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder method to set the delay ceiling.
    pub fn with_cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// Delay before retrying after `attempt` failures (1-based):
    /// `min(2^attempt + jitter, cap)` seconds, with `jitter` in `[0, 1)`.
    pub fn delay_for(&self, attempt: u32, jitter: f64) -> Duration {
        let base = 2f64.powi(attempt.min(31) as i32);
        let capped = (base + jitter).min(self.cap.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Suspension point used by retry backoff and readiness polling.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
