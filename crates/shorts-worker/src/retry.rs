//! Retry utilities with exponential backoff.
//!
//! Used around generation calls against a flaky remote provider.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Same limits under another operation name.
    pub fn named(&self, operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..self.clone()
        }
    }

    /// Calculate delay for a given attempt number.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all retries were exhausted, or with a
    /// non-retryable error.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

/// Execute an async operation, retrying errors `should_retry` accepts.
///
/// # Example
/// ```ignore
/// let config = RetryConfig::new("story").with_max_retries(2);
/// let result = retry_async(&config, || client.generate(&request), LlmError::is_retryable).await;
/// ```
pub async fn retry_async<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> RetryResult<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if attempt < config.max_retries && should_retry(&e) => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt + 1,
                }
            }
        }
    }
}
