//! Receiver-to-forwarder orchestration
//!
//! ```text
//! [Receivers]                 [Pipeline]                      [Forwarders]
//!   native log ──AsyncRx──┐                ┌─ Lane(log)  ── Limiter ──→ log
//!   envoy ALS  ──AsyncRx──┼── fan-in ── by event_type ── Lane(als)  ── Limiter ──→ ALS
//!   http log   ──AsyncRx──┘                └─ Lane(...)  ── Limiter ──→ ...
//!
//!   sync receivers ── SyncInvoker ── forwarder.sync_forward ──→ upstream
//! ```
//!
//! One reader task per receiver channel appends into the lane of the
//! envelope's type. Each lane owns a buffer and a limiter; flushes steal
//! the buffer and forward it whole. Sync requests bypass the lanes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossfire::AsyncRx;
use satellite_config::PipelineConfig;
use satellite_metrics::{PipelineMetricsProvider, PipelineSnapshot};
use satellite_protocol::{Envelope, EventType, SyncInvoker};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};
use crate::forwarder::{FallbackPolicy, Forwarder};
use crate::invoker::ForwarderSyncInvoker;
use crate::lane::Lane;
use crate::limiter::{FlushTarget, Limiter, LimiterConfig};
use crate::metrics::PipelineMetrics;

/// Settings applied to every lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneConfig {
    pub buffer_capacity: usize,
    pub limiter: LimiterConfig,
    pub fallback: FallbackPolicy,
}

impl LaneConfig {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            buffer_capacity: config.buffer_capacity,
            limiter: LimiterConfig::new(config.flush_period, config.limit_count),
            fallback: FallbackPolicy::from_config(config),
        }
    }
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Collects forwarders before any task is started
pub struct PipelineBuilder {
    config: LaneConfig,
    forwarders: Vec<Arc<dyn Forwarder>>,
}

impl PipelineBuilder {
    pub fn new(config: LaneConfig) -> Self {
        Self {
            config,
            forwarders: Vec::new(),
        }
    }

    /// Register the forwarder for its `forward_type()`
    ///
    /// # Errors
    ///
    /// A second forwarder for the same type is rejected.
    pub fn add_forwarder(&mut self, forwarder: Arc<dyn Forwarder>) -> Result<&mut Self> {
        let event_type = forwarder.forward_type();
        if let Some(existing) = self
            .forwarders
            .iter()
            .find(|f| f.forward_type() == event_type)
        {
            return Err(PipelineError::duplicate_forwarder(
                event_type,
                existing.name(),
                forwarder.name(),
            ));
        }
        self.forwarders.push(forwarder);
        Ok(self)
    }

    /// Create the lanes and start one limiter per lane
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<Pipeline> {
        if self.config.buffer_capacity == 0 {
            return Err(PipelineError::ZeroCapacity);
        }

        let metrics = Arc::new(PipelineMetrics::new());
        let limiter_parent = CancellationToken::new();
        let mut lanes = HashMap::with_capacity(self.forwarders.len());
        let mut invoker = ForwarderSyncInvoker::new();

        for forwarder in self.forwarders {
            let event_type = forwarder.forward_type();
            invoker.register(Arc::clone(&forwarder));

            let lane = Arc::new(Lane::new(
                forwarder,
                self.config.buffer_capacity,
                self.config.fallback,
                Arc::clone(&metrics),
            ));
            let limiter = Limiter::start(
                self.config.limiter,
                Arc::clone(&lane) as Arc<dyn FlushTarget>,
                &limiter_parent,
            )?;

            tracing::debug!(
                forwarder = %lane.forwarder().name(),
                event_type = %event_type,
                capacity = self.config.buffer_capacity,
                "lane started"
            );
            lanes.insert(event_type, LaneHandle { lane, limiter });
        }

        Ok(Pipeline {
            lanes: Arc::new(lanes),
            invoker: Arc::new(invoker),
            metrics,
            readers: Vec::new(),
            reader_stop: CancellationToken::new(),
            limiter_parent,
        })
    }
}

struct LaneHandle {
    lane: Arc<Lane>,
    limiter: Limiter,
}

impl LaneHandle {
    #[inline]
    fn append(&self, envelope: Envelope) {
        self.lane.append(envelope);
        self.limiter.check();
    }
}

/// Running pipeline
pub struct Pipeline {
    lanes: Arc<HashMap<EventType, LaneHandle>>,
    invoker: Arc<ForwarderSyncInvoker>,
    metrics: Arc<PipelineMetrics>,
    readers: Vec<JoinHandle<()>>,
    reader_stop: CancellationToken,
    limiter_parent: CancellationToken,
}

impl Pipeline {
    /// Spawn a fan-in reader for one receiver's channel
    ///
    /// The reader runs until the channel closes or `shutdown` is called.
    pub fn attach(&mut self, receiver: impl Into<String>, channel: AsyncRx<Envelope>) {
        let receiver = receiver.into();
        let lanes = Arc::clone(&self.lanes);
        let metrics = Arc::clone(&self.metrics);
        let stop = self.reader_stop.clone();

        let reader = tokio::spawn(async move {
            tracing::debug!(receiver = %receiver, "pipeline reader starting");
            loop {
                let envelope = tokio::select! {
                    biased;
                    result = channel.recv() => match result {
                        Ok(envelope) => envelope,
                        Err(_) => break,
                    },
                    _ = stop.cancelled() => break,
                };

                metrics.record_received();
                match lanes.get(&envelope.event_type()) {
                    Some(lane) => lane.append(envelope),
                    None => {
                        metrics.record_unrouted();
                        tracing::debug!(
                            receiver = %receiver,
                            event_type = %envelope.event_type(),
                            "no forwarder for event type, dropping envelope"
                        );
                    }
                }
            }
            tracing::debug!(receiver = %receiver, "pipeline reader stopped");
        });
        self.readers.push(reader);
    }

    /// The bridge handed to sync-capable receivers
    pub fn sync_invoker(&self) -> Arc<dyn SyncInvoker> {
        Arc::clone(&self.invoker) as Arc<dyn SyncInvoker>
    }

    /// Event types with a lane, sorted
    pub fn event_types(&self) -> Vec<EventType> {
        let mut types: Vec<_> = self.lanes.keys().copied().collect();
        types.sort();
        types
    }

    /// Envelopes waiting in the lane for `event_type`
    pub fn pending(&self, event_type: EventType) -> Option<usize> {
        self.lanes.get(&event_type).map(|h| h.lane.pending())
    }

    #[inline]
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn metrics_handle(&self) -> PipelineMetricsHandle {
        PipelineMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Stop the readers, then stop every limiter with a final flush
    ///
    /// Call after the servers have stopped accepting so no envelope is
    /// left in flight. Work still running after `timeout` is abandoned.
    pub async fn shutdown(self, timeout: Duration) -> Result<()> {
        self.reader_stop.cancel();

        let aborts: Vec<_> = self.readers.iter().map(JoinHandle::abort_handle).collect();
        let lanes = Arc::clone(&self.lanes);
        let readers = self.readers;

        let drain = async move {
            for reader in readers {
                if let Err(e) = reader.await
                    && e.is_panic()
                {
                    tracing::error!(error = %e, "pipeline reader panicked");
                }
            }
            for handle in lanes.values() {
                handle.limiter.stop().await;
            }
        };

        match tokio::time::timeout(timeout, drain).await {
            Ok(()) => {
                let s = self.metrics.snapshot();
                tracing::info!(
                    received = s.envelopes_received,
                    forwarded = s.envelopes_forwarded,
                    dropped = s.envelopes_dropped,
                    overflows = s.buffer_overflows,
                    "pipeline stopped"
                );
                Ok(())
            }
            Err(_) => {
                for abort in aborts {
                    abort.abort();
                }
                self.limiter_parent.cancel();
                Err(PipelineError::ShutdownTimeout(timeout))
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("event_types", &self.event_types())
            .field("readers", &self.readers.len())
            .finish()
    }
}

/// Metrics handle for the reporter
#[derive(Clone)]
pub struct PipelineMetricsHandle {
    metrics: Arc<PipelineMetrics>,
}

impl PipelineMetricsProvider for PipelineMetricsHandle {
    fn pipeline_snapshot(&self) -> PipelineSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
