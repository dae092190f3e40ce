//! Bounded retries for transient failures.
//!
//! # Responsibilities
//! - Classify errors as transient or terminal via [`Retryable`]
//! - Re-run an async operation with exponential backoff while it fails transiently
//! - Return terminal errors immediately, without waiting

use std::fmt::Display;
use std::future::Future;

use crate::config::schema::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;

/// Errors that know whether repeating the operation could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.base_delay_ms, self.max_delay_ms)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Run `op` until it succeeds, fails terminally, or attempts run out.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: RetryPolicy, op_name: &'static str, mut op: F) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = policy.backoff();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                metrics::record_retry(op_name);
                tracing::warn!(
                    op = op_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(backoff.next_delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}
