use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;

use crate::errors::ServiceError;

// @module: Retry with exponential backoff and jitter

/// Retry policy for the synchronous translation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Multiplier applied per further attempt
    pub factor: u32,
    /// Upper bound of the random extra delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy without waiting between attempts
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
            factor: 1,
            max_jitter: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let multiplier = self.factor.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(multiplier)
    }

    /// Backoff plus a random jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        self.backoff(retry) + jitter
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run
    /// out. Only rate-limit and server errors are retried; exhausting the
    /// attempts turns them into `ServiceUnavailable`.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Translation request failed ({}), retrying in {:?} - attempt {}/{}",
                        e, delay, attempt + 1, attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    return Err(ServiceError::ServiceUnavailable(format!(
                        "{} (gave up after {} attempts)",
                        e, attempt
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
