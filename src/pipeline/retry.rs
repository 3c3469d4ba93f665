use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use tracing::warn;

/// Bounded retry with a constant pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; zero is treated as one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Runs once, never retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Calls `operation` until it succeeds or the attempts run out, returning
    /// the last error in the latter case.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let backoff = ConstantBuilder::default()
            .with_delay(self.backoff)
            .with_max_times((self.max_attempts - 1) as usize);

        operation
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|err: &E, delay: Duration| {
                warn!(error = %err, retry_in_ms = delay.as_millis() as u64, "Attempt failed, retrying");
            })
            .await
    }
}
