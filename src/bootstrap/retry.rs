//! Exponential backoff for startup connections.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Backoff schedule: `base * 2^attempt`, capped at `max`, for at most
/// `max_attempts` tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Wait after the first failure.
    pub base_interval: Duration,
    /// Upper bound on any single wait.
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed attempt with 0-based index `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_interval
            .checked_mul(factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Number of attempts made.
    pub attempts: u32,
    /// Error from the final attempt.
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

/// Runs `op` until it succeeds or the policy is exhausted, sleeping
/// [`RetryPolicy::delay_for`] between attempts. Success returns at once;
/// there is no wait after the final failure.
///
/// # Errors
///
/// Returns [`RetryExhausted`] carrying the last error when every attempt
/// fails. A policy with zero attempts is treated as one.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(what, attempts = attempt + 1, "connected after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                let tried = attempt + 1;
                if tried >= max_attempts {
                    tracing::error!(what, attempts = tried, error = %err, "giving up");
                    return Err(RetryExhausted {
                        attempts: tried,
                        last_error: err,
                    });
                }
                let wait = policy.delay_for(attempt);
                tracing::warn!(
                    what,
                    attempt = tried,
                    max_attempts,
                    error = %err,
                    backoff_ms = wait.as_millis() as u64,
                    "connection attempt failed; retrying"
                );
                tokio::time::sleep(wait).await;
                attempt = tried;
            }
        }
    }
}
