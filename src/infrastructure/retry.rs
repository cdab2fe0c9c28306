//! Retry Policy
//!
//! Exponential backoff with randomized jitter and an attempt cap.

use std::future::Future;
use std::time::Duration;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
    /// Jitter factor in [0, 1]; each delay is drawn from delay * (1 ± jitter)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(3),
            jitter: 0.75,
        }
    }
}

/// Retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Nominal delay before retry number `retry` (0-based), without jitter.
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.config.base_delay.saturating_mul(factor)
    }

    /// Delay before retry number `retry` (0-based), with jitter applied.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let nominal = self.nominal_delay(retry);
        let jitter = self.config.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return nominal;
        }

        // Uniform in [1 - jitter, 1 + jitter].
        let factor = 1.0 + jitter * (2.0 * rand::random::<f64>() - 1.0);
        nominal.mul_f64(factor.max(0.0))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt cap is reached. The last error is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && is_transient(&err) => {
                    let delay = self.delay_for(attempt - 1);
                    tracing::warn!(
                        "attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 1 {
                        tracing::warn!("giving up after {} attempts: {}", attempt, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
