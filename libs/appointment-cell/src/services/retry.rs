// libs/appointment-cell/src/services/retry.rs
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use shared_config::AppConfig;

/// Exponential backoff for store I/O performed after a successful engine
/// result. Pair every retried write with the same idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.booking_retry_max_attempts.max(1),
            base_delay: Duration::from_millis(config.booking_retry_base_delay_ms),
        }
    }

    /// Delay after the zero-based `attempt` fails: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are spent,
/// returning the last error. No delay follows the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("Giving up after {} attempts: {}", attempts, e);
                return Err(e);
            }
        }
    }
}
