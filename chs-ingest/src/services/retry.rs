//! Retry with exponential backoff and jitter for archive requests
//!
//! Only failures classified retryable by `FetchError::is_retryable` are
//! retried; anything else is returned on the attempt that produced it.

use crate::error::FetchError;
use chs_common::config::IngestSettings;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Attempt bound and backoff window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(300),
            max_backoff: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &IngestSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
        }
    }

    /// Backoff before attempt `attempt + 1`, without jitter
    ///
    /// Doubles from `initial_backoff`, capped at `max_backoff`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Jittered backoff: base delay scaled by a factor in [0.5, 1.0]
    fn jittered_delay(&self, attempt: u32) -> Duration {
        let jitter: f64 = rand::thread_rng().gen_range(0.5..=1.0);
        self.base_delay(attempt).mul_f64(jitter)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out
    ///
    /// # Arguments
    /// * `operation_name` - Name for logging (e.g. "fetch month")
    /// * `operation` - Async closure performing one attempt
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Terminal fetch failure, not retrying"
                    );
                    return Err(err);
                }
                Err(err) if attempt >= self.max_attempts => {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Fetch failed: retries exhausted"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.jittered_delay(attempt);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retryable fetch failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
