//! Forwarder lanes
//!
//! A lane is one forwarder plus its batch buffer. The lane's limiter calls
//! `flush`, which steals the buffer, forwards it, and applies the fallback
//! policy when the forwarder fails.

use std::sync::Arc;

use async_trait::async_trait;
use satellite_protocol::{Envelope, EventType};

use crate::buffer::{AppendOutcome, BatchBuffer};
use crate::forwarder::{FallbackPolicy, Forwarder};
use crate::limiter::FlushTarget;
use crate::metrics::{OverflowTracker, PipelineMetrics};

pub struct Lane {
    buffer: BatchBuffer,
    forwarder: Arc<dyn Forwarder>,
    fallback: FallbackPolicy,
    metrics: Arc<PipelineMetrics>,
    overflow: OverflowTracker,
}

impl Lane {
    pub fn new(
        forwarder: Arc<dyn Forwarder>,
        capacity: usize,
        fallback: FallbackPolicy,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let overflow = OverflowTracker::new(forwarder.name());
        Self {
            buffer: BatchBuffer::new(capacity),
            forwarder,
            fallback,
            metrics,
            overflow,
        }
    }

    #[inline]
    pub fn event_type(&self) -> EventType {
        self.forwarder.forward_type()
    }

    #[inline]
    pub fn forwarder(&self) -> &Arc<dyn Forwarder> {
        &self.forwarder
    }

    /// Buffer an envelope at the next offset
    pub fn append(&self, envelope: Envelope) -> AppendOutcome {
        let outcome = self.buffer.push(envelope);
        match outcome {
            AppendOutcome::Accepted => self.metrics.record_buffered(),
            AppendOutcome::Overflow => {
                self.metrics.record_overflow();
                self.overflow.record_drop();
            }
            AppendOutcome::Malformed => self.metrics.record_malformed(),
        }
        outcome
    }

    async fn deliver(&self, batch: &[Envelope]) -> bool {
        let count = batch.len() as u64;

        let err = match self.forwarder.forward(batch).await {
            Ok(()) => {
                self.metrics.record_forwarded(count);
                return true;
            }
            Err(e) => e,
        };
        self.metrics.record_failed();

        if let FallbackPolicy::RetryOnce { backoff } = self.fallback {
            tracing::warn!(
                forwarder = %self.forwarder.name(),
                envelopes = count,
                error = %err,
                backoff_ms = backoff.as_millis() as u64,
                "forward failed, retrying once"
            );
            tokio::time::sleep(backoff).await;
            self.metrics.record_retry();

            match self.forwarder.forward(batch).await {
                Ok(()) => {
                    self.metrics.record_forwarded(count);
                    return true;
                }
                Err(retry_err) => {
                    self.metrics.record_failed();
                    tracing::error!(
                        forwarder = %self.forwarder.name(),
                        envelopes = count,
                        error = %retry_err,
                        "retry failed, dropping batch"
                    );
                }
            }
        } else {
            tracing::error!(
                forwarder = %self.forwarder.name(),
                envelopes = count,
                error = %err,
                "forward failed, dropping batch"
            );
        }

        self.metrics.record_dropped(count);
        false
    }
}

#[async_trait]
impl FlushTarget for Lane {
    fn pending(&self) -> usize {
        self.buffer.len()
    }

    async fn flush(&self) {
        self.metrics.record_flush();

        let batch = self.buffer.take();
        if batch.is_empty() {
            return;
        }

        tracing::trace!(
            forwarder = %self.forwarder.name(),
            first = batch.first,
            last = batch.last,
            "flushing batch"
        );

        let envelopes = batch.into_envelopes();
        self.deliver(&envelopes).await;
    }
}

impl std::fmt::Debug for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lane")
            .field("forwarder", &self.forwarder.name())
            .field("event_type", &self.event_type())
            .field("pending", &self.buffer.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}
