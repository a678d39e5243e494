use std::future::Future;
use std::time::Duration;

use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, warn};

use crate::error::AppError;

/// Backoff schedule for calls to the upstream metrics API.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::metrics_api(2)
    }
}

impl RetryConfig {
    /// The public API is rate limited, so the first retry waits at least one
    /// limiter interval.
    pub fn metrics_api(max_retries: usize) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.initial_delay.as_millis().max(1) as u64)
            .max_delay(self.max_delay)
            .take(self.max_retries)
    }
}

/// Run `operation`, retrying transient failures (see [`AppError::is_transient`])
/// on the configured backoff. Permanent failures are returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: RetryConfig,
    operation_name: &str,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let result = RetryIf::spawn(config.strategy(), operation, |e: &AppError| {
        let transient = e.is_transient();
        if transient {
            warn!(operation = operation_name, error = %e, "Transient failure, retrying");
        }
        transient
    })
    .await;

    if let Err(e) = &result {
        debug!(operation = operation_name, error = %e, retries = config.max_retries, "Giving up");
    }
    result
}

/// Bound a fallible future; elapsing counts as an upstream failure.
pub async fn with_timeout<F, T>(future: F, timeout: Duration, operation_name: &str) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(timeout, future).await.unwrap_or_else(|_| {
        Err(AppError::ExternalApiError(format!(
            "{} timed out after {}ms",
            operation_name,
            timeout.as_millis()
        )))
    })
}
