//! Exponential-backoff retry helper
//!
//! Standalone wrapper over `tokio_retry`. Deliberately not wired into the
//! webhook path: Stripe already redelivers failed webhooks, so the handler
//! stays sequential and the helper is available for callers that want it.

use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;

/// Run `operation`, retrying up to `max_retries` additional times with
/// exponentially increasing delays starting at `base_delay`. Returns the
/// first success, or the last error once retries are exhausted.
pub async fn fetch_with_retry<T, E, F, Fut>(
    max_retries: usize,
    base_delay: Duration,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let strategy = ExponentialBackoff::from_millis(base_delay.as_millis() as u64)
        .take(max_retries);
    Retry::spawn(strategy, operation).await
}
