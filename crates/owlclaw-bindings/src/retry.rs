//! Retry with exponential backoff.
//!
//! Every attempt runs under `tokio::time::timeout(timeout_ms)`. Only transport
//! failures and timeouts are retried; the delay before retry `n` (0-indexed)
//! is `backoff_ms * backoff_multiplier^n`. Sleeping goes through [`Sleeper`]
//! so tests can observe delays without waiting for them.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BindingError;

/// Retry policy attached to every binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Growth factor applied per retry.
    #[serde(default = "default_backoff_multiplier", alias = "multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_ms() -> u64 {
    1000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-indexed).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let millis = self.backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
    }
}

/// Source of delays between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` under `policy`, passing the 0-indexed attempt number.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-retryable error immediately.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryConfig,
    timeout_ms: u64,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    mut operation: F,
) -> Result<T, BindingError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BindingError>>,
{
    let attempts = policy.max_attempts.max(1);
    let timeout = Duration::from_millis(timeout_ms);
    let mut attempt = 0;

    loop {
        debug!(
            operation = operation_name,
            attempt = attempt + 1,
            max_attempts = attempts,
            "Executing attempt"
        );

        let outcome = tokio::time::timeout(timeout, operation(attempt))
            .await
            .unwrap_or(Err(BindingError::Timeout { timeout_ms }));

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Attempt failed, retrying"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
