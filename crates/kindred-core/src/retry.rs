//! Retry delay and cancellation primitives for the ingestion pipeline.
//!
//! The delay between overload retries is injected through [`Backoff`] so the
//! pipeline can run its retry path without wall-clock waits in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Waits between two submissions of the same batch.
#[async_trait]
pub trait Backoff: Send + Sync {
    /// Suspend before submission number `next_attempt` (2 for the first retry).
    async fn wait(&self, next_attempt: u32);
}

/// Constant delay on the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Backoff for FixedBackoff {
    async fn wait(&self, _next_attempt: u32) {
        tokio::time::sleep(self.delay).await;
    }
}

/// Retries immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

#[async_trait]
impl Backoff for NoBackoff {
    async fn wait(&self, _next_attempt: u32) {}
}

/// Shared cancellation signal for an ingestion run.
///
/// Batch tasks check it when they start and before every retry sleep; a batch
/// already on the wire is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
