use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use lmkit_config::{RetryConfig, RetryStrategyConfig};
use rand::Rng;

use crate::error::LlmError;

/// Bounded exponential backoff with random jitter
///
/// Wraps exactly one logical operation. Every failure is retried until
/// `max_attempts` attempts have been made; the last error is then returned
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    min_wait: Duration,
    max_wait: Duration,
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(20), 3)
    }
}

impl RetryPolicy {
    /// `max_wait` is raised to `min_wait` and `max_attempts` to one if needed
    pub fn new(min_wait: Duration, max_wait: Duration, max_attempts: u32) -> Self {
        Self {
            min_wait,
            max_wait: max_wait.max(min_wait),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Policy for an endpoint's `retry` setting, `None` when disabled
    pub fn from_config(config: &RetryConfig) -> Result<Option<Self>, LlmError> {
        config.strategy().map(|strategy| Self::from_strategy(&strategy)).transpose()
    }

    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] when the waits do not fit a `Duration`
    pub fn from_strategy(strategy: &RetryStrategyConfig) -> Result<Self, LlmError> {
        let (min_wait, max_wait) = strategy.wait_bounds().map_err(LlmError::Configuration)?;
        Ok(Self::new(min_wait, max_wait, strategy.max_attempts))
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of the wait after failed attempt `attempt` (1-based)
    ///
    /// Doubles per attempt starting at `min_wait`, capped at `max_wait`.
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_wait.saturating_mul(factor).clamp(self.min_wait, self.max_wait)
    }

    /// Randomized wait in `[min_wait, backoff_ceiling(attempt)]`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        if ceiling <= self.min_wait {
            return self.min_wait;
        }
        rand::rng().random_range(self.min_wait..=ceiling)
    }

    /// Run `attempt_fn` until it succeeds or attempts run out
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
