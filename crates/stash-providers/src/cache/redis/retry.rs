//! Bounded retry with exponential backoff
//!
//! Only errors classified as transient by
//! [`Error::is_transient`](stash_domain::Error::is_transient) are retried.
//! With the defaults (3 attempts, 100 ms base) a call that keeps failing
//! waits 100 ms, then 200 ms, then gives up with the last error.

use stash_domain::constants::{RETRY_BASE_DELAY_MS, RETRY_MAX_ATTEMPTS};
use stash_domain::error::Result;
use std::future::Future;
use std::time::Duration;

/// Attempt budget and first backoff delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `operation` until it succeeds, fails permanently, or the budget runs out
    ///
    /// Nothing is held across the backoff sleep besides the closure itself.
    pub async fn execute<T, F, Fut>(&self, op_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.base_delay;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() || attempt >= self.max_attempts => {
                    if e.is_transient() {
                        tracing::error!(
                            operation = op_name,
                            attempts = attempt,
                            error = %e,
                            "remote operation failed after all retries"
                        );
                    }
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        operation = op_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "transient remote failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }
}
