//! Retry with bounded exponential backoff.
//!
//! Semantics:
//! - `max_retries` counts retries, so at most `max_retries + 1` attempts run.
//! - Only [`ErrorKind::TransientServer`](crate::ErrorKind) failures are
//!   retried; every other kind returns after the first attempt regardless of
//!   the configured budget.
//! - Delay for retry `i` (0-based) is `backoff_factor^i`, capped at
//!   [`MAX_DELAY`]. When jitter is enabled, a uniform random 0–25% of the
//!   capped delay is added on top, so delays land in `[0, MAX_DELAY * 1.25]`.
//! - When the budget is exhausted, the final attempt's error is returned
//!   unwrapped, so callers still match on its kind.
//! - There is no wall-clock deadline spanning attempts; the total budget is
//!   the retry count times the (bounded) delays, plus the per-attempt timeout
//!   owned by the transport.
//!
//! The [`Sleeper`] is injectable so tests can observe or skip delays.

use crate::error::ApiError;
use crate::sleeper::{Sleeper, TokioSleeper};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Upper bound on a single computed backoff delay, before jitter.
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry policy for fallible async operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_factor: f64,
    jitter: bool,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    /// Construct a new builder with the client defaults.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// Number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute an operation, retrying transient failures with backoff.
    ///
    /// The operation performs one full attempt per invocation; it is invoked
    /// again after each retryable failure, so any pacing it does internally
    /// applies to every attempt.
    pub async fn execute<T, Fut, Op>(&self, mut operation: Op) -> Result<T, ApiError>
    where
        T: Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.max_retries {
                        error!(
                            error = %err,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            "request failed and will not be retried"
                        );
                        return Err(err);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        error = %err,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs_f64(),
                        "request failed, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }

        // The final iteration (attempt == max_retries) always returns.
        unreachable!("retry loop returns on the final attempt")
    }

    /// Delay before retry `attempt` (0-based).
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .backoff_factor
            .powi(attempt.min(i32::MAX as u32) as i32)
            .min(MAX_DELAY.as_secs_f64());
        let jitter = if self.jitter {
            base * 0.25 * rand::rng().random::<f64>()
        } else {
            0.0
        };
        Duration::from_secs_f64(base + jitter)
    }
}

/// Errors produced while building a retry policy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// `backoff_factor` must be > 1.0 for delays to grow.
    #[error("backoff_factor must be greater than 1.0 (got {0})")]
    InvalidBackoffFactor(f64),
}

/// Builder for [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryPolicyBuilder {
    max_retries: u32,
    backoff_factor: f64,
    jitter: bool,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicyBuilder {
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 2.0,
            jitter: true,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Retries after the initial attempt. Zero means a single attempt.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Exponential multiplier applied per retry. Must be > 1.0.
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Add a random 0–25% to each delay to avoid synchronized retries.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Build the retry policy, validating inputs.
    pub fn build(self) -> Result<RetryPolicy, BuildError> {
        if !(self.backoff_factor > 1.0) || !self.backoff_factor.is_finite() {
            return Err(BuildError::InvalidBackoffFactor(self.backoff_factor));
        }
        Ok(RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: self.backoff_factor,
            jitter: self.jitter,
            sleeper: self.sleeper,
        })
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
