//! Intra-source retry scheduling
//!
//! Exponential backoff for transient network failures: base 1000ms,
//! doubling per attempt, capped at 10s, at most [`PlayerConfig::max_retries`]
//! retries per source activation. Timers are cancellable so teardown can
//! guarantee no late fires.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::PlayerConfig;

/// Backoff delay before retry number `retry_count` (1-based).
///
/// `retry_count` is the value after incrementing for the upcoming
/// attempt: 1 -> base, 2 -> 2x base, 3 -> 4x base, capped.
pub fn retry_delay(config: &PlayerConfig, retry_count: u32) -> Duration {
    let exponent = retry_count.saturating_sub(1).min(31);
    let ms = config
        .retry_base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.retry_max_delay_ms);
    Duration::from_millis(ms)
}

/// True when the retry budget for the current activation is spent and
/// the failure should be handed to the fallback router instead.
pub fn budget_exhausted(config: &PlayerConfig, retry_count: u32) -> bool {
    retry_count > config.max_retries
}

/// A pending retry timer. Aborting the underlying task (explicitly or
/// on drop) guarantees the deferred work never runs.
#[derive(Debug)]
pub struct ScheduledRetry {
    handle: JoinHandle<()>,
}

impl ScheduledRetry {
    /// Sleep for `delay`, then run `work`. The sleep and the work are
    /// both cancelled if this handle is aborted or dropped first.
    pub fn spawn<F, Fut>(delay: Duration, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work().await;
        });
        debug!(delay_ms = delay.as_millis() as u64, "Retry scheduled");
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledRetry {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
