//! Exponential backoff for provider requests

use super::FetchError;
use crate::config::ProvidersConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ProvidersConfig) -> Self {
        Self::new(
            config.retry_attempts,
            config.retry_backoff(),
            config.retry_backoff_max(),
        )
    }

    /// Delay before retry number `retry` (0-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `call` until it succeeds, fails permanently or attempts run out.
    /// Only [`FetchError::Transient`] failures are retried.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.backoff(attempt as u32 - 1) + self.jitter();
                    debug!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after transient failure: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn jitter(&self) -> Duration {
        let bound = (self.base_delay.as_millis() as u64) / 4;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=bound))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500), Duration::from_secs(2))
    }
}
