//! Bounded retry with linear backoff for transient collaborator failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::MergeConfig;

/// Errors that can tell whether a repeat of the same call might succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Fixed attempt cap; the wait before attempt `n + 1` is `n * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    pub fn from_merge_config(config: &MergeConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_secs(config.backoff_step_secs))
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// the attempt cap is reached. The last error is returned on exhaustion.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation_name: &str, mut operation: F) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "'{}' succeeded on attempt {}/{}",
                        operation_name, attempt, policy.max_attempts
                    );
                }
                return Ok(value);
            }
            Err(err) if !err.is_transient() => {
                debug!("'{}' failed with non-retryable error: {}", operation_name, err);
                return Err(err);
            }
            Err(err) if attempt >= policy.max_attempts => {
                warn!(
                    "'{}' failed after {} attempts: {}",
                    operation_name, policy.max_attempts, err
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "'{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name, attempt, policy.max_attempts, delay, err
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
