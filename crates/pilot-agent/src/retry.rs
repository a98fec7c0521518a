//! Bounded retries and timeouts around provider calls

use std::future::Future;
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Run `fut` with a deadline; elapsing maps to [`pilot_ai::Error::Timeout`].
pub async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = pilot_ai::Result<T>>,
) -> pilot_ai::Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(pilot_ai::Error::Timeout),
    }
}

/// Call `attempt` until it succeeds, fails with a non-retryable error, or
/// `config.max_retries` retries have been spent.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &'static str,
    mut attempt: F,
) -> pilot_ai::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = pilot_ai::Result<T>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retries < config.max_retries => {
                let delay = config.delay_for_attempt(retries);
                tracing::warn!(
                    operation,
                    retry = retries + 1,
                    max_retries = config.max_retries,
                    error = %e,
                    "transient failure, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
