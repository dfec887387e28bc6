//! Retry policy for rate-limited backend calls.

use std::future::Future;
use std::time::Duration;

use schemasync_core::BackendError;

/// Default number of attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay after the first failed attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

/// Default upper bound for a single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(2000);

/// Exponential backoff for rate-limit errors.
///
/// Only [`BackendError::RateLimited`] is retried; every other error is
/// returned after the first attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Cap for any single delay.
    pub max_delay: Duration,
}

/// Result of a retried call.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Final result.
    pub result: Result<T, BackendError>,
    /// Attempts made.
    pub attempts: u32,
}

impl RetryPolicy {
    /// Create a policy with the default schedule.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new().with_max_attempts(1)
    }

    /// Set the number of attempts (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay after each failed attempt, in order.
    ///
    /// The last entry is never slept: [`RetryPolicy::execute`] returns after
    /// the final attempt, so the default policy waits 3750 ms in total.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts).map(|a| self.delay_for(a)).collect()
    }

    /// Check if an error is worth retrying.
    pub fn is_retryable(&self, err: &BackendError) -> bool {
        err.is_rate_limited()
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. `call` receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut call: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match call(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(err) if self.is_retryable(&err) && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
