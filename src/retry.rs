//! Fixed-interval retry executor.

use std::future::Future;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{HttpClientError, Result, RetryConfig};

/// Runs `attempt` up to `max_retries + 1` times.
///
/// Returns the first success, or the last error once attempts are exhausted.
/// Every error is retried the same way; there is no delay after the final
/// attempt. The closure receives the zero-based attempt number.
pub async fn run<T, F, Fut>(
    config: &RetryConfig,
    cancel: Option<&CancellationToken>,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut current = 0usize;
    loop {
        match attempt(current).await {
            Ok(value) => return Ok(value),
            Err(err) if current >= config.max_retries => return Err(err),
            Err(_) => {
                wait_before_retry(config, cancel).await?;
                current += 1;
            }
        }
    }
}

async fn wait_before_retry(config: &RetryConfig, cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if config.cancellable_sleep => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(HttpClientError::Cancelled),
                _ = sleep(config.interval) => Ok(()),
            }
        }
        _ => {
            sleep(config.interval).await;
            Ok(())
        }
    }
}
