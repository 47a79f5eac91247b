//! Dual-trigger flush limiter
//!
//! One worker task per limiter calls `FlushTarget::flush` when the first of
//! these happens:
//!
//! - the flush period elapses
//! - `check()` sees at least `limit_count` pending items
//! - the limiter is stopped or its parent token is cancelled (final flush)
//!
//! Flushes run on the worker only, so they never overlap. The size trigger
//! is a single-slot channel: `check()` never waits, and requests that arrive
//! while one is already queued collapse into it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};

/// Something a limiter drains
#[async_trait]
pub trait FlushTarget: Send + Sync + 'static {
    /// Items waiting for the next flush
    fn pending(&self) -> usize;

    /// Drain and deliver; called even when nothing is pending
    async fn flush(&self);
}

/// Limiter triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Time trigger, must be non-zero
    pub flush_period: Duration,
    /// Size trigger, 0 disables it
    pub limit_count: usize,
}

impl LimiterConfig {
    pub fn new(flush_period: Duration, limit_count: usize) -> Self {
        Self {
            flush_period,
            limit_count,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.flush_period.is_zero() {
            return Err(PipelineError::InvalidLimiter(
                "flush period must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 500)
    }
}

/// Handle to a running limiter worker
pub struct Limiter {
    config: LimiterConfig,
    target: Arc<dyn FlushTarget>,
    flush_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Limiter {
    /// Validate `config` and spawn the worker
    ///
    /// The worker stops when `stop()` is called, when the limiter is
    /// dropped, or when `parent` is cancelled.
    pub fn start(
        config: LimiterConfig,
        target: Arc<dyn FlushTarget>,
        parent: &CancellationToken,
    ) -> Result<Self> {
        config.validate()?;

        let (flush_tx, flush_rx) = mpsc::channel(1);
        let cancel = parent.child_token();
        let worker = tokio::spawn(run_worker(
            config.flush_period,
            Arc::clone(&target),
            flush_rx,
            cancel.clone(),
        ));

        Ok(Self {
            config,
            target,
            flush_tx,
            cancel,
            worker: Mutex::new(Some(worker)),
        })
    }

    #[inline]
    pub fn config(&self) -> LimiterConfig {
        self.config
    }

    /// Request a flush if the size trigger is reached
    ///
    /// Never blocks. Returns true when a request was queued.
    pub fn check(&self) -> bool {
        if self.config.limit_count == 0 || self.target.pending() < self.config.limit_count {
            return false;
        }
        self.flush_tx.try_send(()).is_ok()
    }

    /// Cancel the worker and wait for its final flush
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            tracing::error!(error = %e, "limiter worker panicked");
        }
    }

    /// Whether the worker has been asked to stop
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Limiter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("config", &self.config)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn run_worker(
    period: Duration,
    target: Arc<dyn FlushTarget>,
    mut flush_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                target.flush().await;
                break;
            }
            _ = ticker.tick() => {
                target.flush().await;
            }
            Some(()) = flush_rx.recv() => {
                target.flush().await;
                ticker.reset();
            }
        }
    }

    tracing::trace!("limiter worker stopped");
}

#[cfg(test)]
#[path = "limiter_test.rs"]
mod tests;
