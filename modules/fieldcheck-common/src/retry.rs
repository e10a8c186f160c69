use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Bounded retry with exponential backoff and jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
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

    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay * 2u32.saturating_pow(attempt);
        let cap = self.base_delay.as_millis() as u64;
        backoff + Duration::from_millis(rand::rng().random_range(0..=cap))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. The last error is returned as-is.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        is_transient: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        op = label,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
