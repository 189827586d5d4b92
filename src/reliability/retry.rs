use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RetryError {
    #[error("Invalid retry configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    ExponentialBackoff,
    LinearBackoff,
    FixedDelay,
}

/// How often and how patiently a failed operation is repeated.
///
/// `max_attempts` counts every attempt, the first one included.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: RetryStrategy,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            strategy: RetryStrategy::ExponentialBackoff,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RetryError> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidConfig(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(RetryError::InvalidConfig(format!(
                "base_delay ({:?}) exceeds max_delay ({:?})",
                self.base_delay, self.max_delay
            )));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_millis = self.base_delay.as_millis() as u64;
        let base_delay = match self.strategy {
            RetryStrategy::ExponentialBackoff => {
                Duration::from_millis(base_millis.saturating_mul(2_u64.saturating_pow(attempt)))
            }
            RetryStrategy::LinearBackoff => {
                Duration::from_millis(base_millis.saturating_mul(attempt as u64 + 1))
            }
            RetryStrategy::FixedDelay => self.base_delay,
        };

        let capped_delay = std::cmp::min(base_delay, self.max_delay);

        if self.jitter {
            apply_jitter(capped_delay)
        } else {
            capped_delay
        }
    }

    /// Runs `operation` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the attempts are used up. The last error is returned.
    pub async fn run<T, E, F, Fut, P>(&self, mut operation: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt + 1 >= self.max_attempts || !is_retryable(&e) {
                        return Err(e);
                    }
                    let delay = self.calculate_delay(attempt);
                    attempt += 1;
                    warn!(
                        "Attempt {} failed: {}; retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5); // ±50% jitter
    Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64)
}
