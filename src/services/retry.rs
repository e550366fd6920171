use futures::future::BoxFuture;
use std::fmt::Display;
use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::error::{ApiError, Result};

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after each failed attempt
    Exponential,
}

impl Backoff {
    fn delay(self, base: Duration, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed => base,
            Backoff::Exponential => base * 2u32.saturating_pow(attempt.saturating_sub(1)),
        }
    }
}

/// Retry operation with backoff, giving up after `max_attempts` tries.
pub async fn retry_with_backoff<'a, F, T, E>(
    label: &str,
    max_attempts: u32,
    base_delay: Duration,
    backoff: Backoff,
    operation: F,
) -> Result<T>
where
    F: Fn() -> BoxFuture<'a, std::result::Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(ApiError::ExternalServiceError(format!(
                        "{} failed after {} attempts: {}",
                        label, max_attempts, e
                    )));
                }
                let delay = backoff.delay(base_delay, attempt);
                warn!(
                    "{}: attempt {} failed, retrying in {:?}: {}",
                    label, attempt, delay, e
                );
                sleep(delay).await;
            }
        }
    }
}
