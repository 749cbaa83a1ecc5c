//! The suspension seam for poll intervals and backoff delays.

use async_trait::async_trait;
use std::time::Duration;

/// Waits for a duration.
///
/// Production code uses `TokioSleeper`; tests substitute a clock that
/// records the requested delays and returns immediately.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
