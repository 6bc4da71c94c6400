use async_trait::async_trait;
use std::time::Duration;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Bounded retry with linear backoff: after failed attempt `n` (1-based),
/// wait `backoff_unit * n` before the next attempt, up to `max_attempts`
/// attempts in total.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Delay to observe after failed attempt number `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }

    /// Whether another attempt is allowed once `attempt` attempts have been
    /// made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(5),
        }
    }
}

/// Suspends the pipeline for a given duration. Production code sleeps on
/// the tokio timer; tests inject a mock to observe delays without waiting
/// on the wall clock.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Timer-backed [`Sleeper`] used outside of tests.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
