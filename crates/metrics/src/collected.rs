//! Collected metrics snapshot and rate calculations
//!
//! Holds every component's metrics at one point in time, plus the
//! per-second rates between two collections.

use std::time::{Duration, Instant};

use crate::{ForwarderMetricsSnapshot, ReceiverMetricsSnapshot, ServerMetricsSnapshot};

/// Pipeline metrics snapshot
///
/// Matches the counters kept by `satellite_pipeline::PipelineMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PipelineSnapshot {
    /// Envelopes read from receiver channels
    pub envelopes_received: u64,
    /// Envelopes with no forwarder for their type
    pub envelopes_unrouted: u64,
    /// Envelopes accepted into a batch buffer
    pub envelopes_buffered: u64,
    /// Envelopes dropped because a buffer was full
    pub buffer_overflows: u64,
    /// Envelopes rejected for a bad offset
    pub envelopes_malformed: u64,
    /// Limiter flush invocations
    pub flushes: u64,
    /// Batches acknowledged by forwarders
    pub batches_forwarded: u64,
    /// Envelopes acknowledged by forwarders
    pub envelopes_forwarded: u64,
    /// Forward attempts that failed
    pub batches_failed: u64,
    /// Batches given up on after the fallback policy
    pub batches_dropped: u64,
    /// Envelopes in dropped batches
    pub envelopes_dropped: u64,
    /// Retries issued by the fallback policy
    pub retries: u64,
}

/// Collected receiver snapshot with metadata
#[derive(Debug, Clone)]
pub struct CollectedReceiver {
    pub id: String,
    pub receiver_type: String,
    pub snapshot: ReceiverMetricsSnapshot,
}

/// Collected forwarder snapshot with metadata
#[derive(Debug, Clone)]
pub struct CollectedForwarder {
    pub id: String,
    pub forwarder_type: String,
    pub snapshot: ForwarderMetricsSnapshot,
}

/// Collected server snapshot with metadata
#[derive(Debug, Clone)]
pub struct CollectedServer {
    pub server_type: String,
    pub snapshot: ServerMetricsSnapshot,
}

/// Complete metrics collection at a point in time
#[derive(Debug, Clone, Default)]
pub struct CollectedMetrics {
    /// When this collection was taken
    pub timestamp: Option<Instant>,
    pub pipeline: Option<PipelineSnapshot>,
    pub servers: Vec<CollectedServer>,
    pub receivers: Vec<CollectedReceiver>,
    pub forwarders: Vec<CollectedForwarder>,
}

impl CollectedMetrics {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self {
            timestamp: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Calculate rates by comparing with a previous collection
    ///
    /// Returns None if timestamps are missing or no time elapsed.
    pub fn rates(&self, previous: &CollectedMetrics) -> Option<MetricsRates> {
        let elapsed = self.timestamp?.duration_since(previous.timestamp?);
        if elapsed.is_zero() {
            return None;
        }
        let secs = elapsed.as_secs_f64();

        let pipeline = match (&self.pipeline, &previous.pipeline) {
            (Some(current), Some(prev)) => Some(PipelineRates {
                received_per_sec: rate(current.envelopes_received, prev.envelopes_received, secs),
                forwarded_per_sec: rate(
                    current.envelopes_forwarded,
                    prev.envelopes_forwarded,
                    secs,
                ),
                flushes_per_sec: rate(current.flushes, prev.flushes, secs),
                overflows: current.buffer_overflows.saturating_sub(prev.buffer_overflows),
                dropped: current.envelopes_dropped.saturating_sub(prev.envelopes_dropped),
            }),
            _ => None,
        };

        let receivers = self
            .receivers
            .iter()
            .filter_map(|current| {
                let prev = previous.receivers.iter().find(|r| r.id == current.id)?;
                Some(ReceiverRates {
                    id: current.id.clone(),
                    receiver_type: current.receiver_type.clone(),
                    frames_per_sec: rate(
                        current.snapshot.frames_received,
                        prev.snapshot.frames_received,
                        secs,
                    ),
                    bytes_per_sec: rate(
                        current.snapshot.bytes_received,
                        prev.snapshot.bytes_received,
                        secs,
                    ),
                    streams_active: current.snapshot.streams_active,
                    errors: (current.snapshot.decode_errors + current.snapshot.sync_failures)
                        .saturating_sub(prev.snapshot.decode_errors + prev.snapshot.sync_failures),
                })
            })
            .collect();

        let forwarders = self
            .forwarders
            .iter()
            .filter_map(|current| {
                let prev = previous.forwarders.iter().find(|f| f.id == current.id)?;
                Some(ForwarderRates {
                    id: current.id.clone(),
                    forwarder_type: current.forwarder_type.clone(),
                    envelopes_per_sec: rate(
                        current.snapshot.envelopes_sent,
                        prev.snapshot.envelopes_sent,
                        secs,
                    ),
                    bytes_per_sec: rate(
                        current.snapshot.bytes_sent,
                        prev.snapshot.bytes_sent,
                        secs,
                    ),
                    errors: (current.snapshot.send_errors + current.snapshot.sync_errors)
                        .saturating_sub(prev.snapshot.send_errors + prev.snapshot.sync_errors),
                })
            })
            .collect();

        Some(MetricsRates {
            elapsed,
            pipeline,
            receivers,
            forwarders,
        })
    }
}

/// Calculate rate per second
#[inline]
fn rate(current: u64, previous: u64, elapsed_secs: f64) -> f64 {
    current.saturating_sub(previous) as f64 / elapsed_secs
}

/// Calculated rates between two collections
#[derive(Debug, Clone)]
pub struct MetricsRates {
    pub elapsed: Duration,
    pub pipeline: Option<PipelineRates>,
    pub receivers: Vec<ReceiverRates>,
    pub forwarders: Vec<ForwarderRates>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineRates {
    pub received_per_sec: f64,
    pub forwarded_per_sec: f64,
    pub flushes_per_sec: f64,
    /// Overflow drops in this period
    pub overflows: u64,
    /// Envelopes dropped after failed forwards in this period
    pub dropped: u64,
}

#[derive(Debug, Clone)]
pub struct ReceiverRates {
    pub id: String,
    pub receiver_type: String,
    pub frames_per_sec: f64,
    pub bytes_per_sec: f64,
    pub streams_active: u64,
    pub errors: u64,
}

#[derive(Debug, Clone)]
pub struct ForwarderRates {
    pub id: String,
    pub forwarder_type: String,
    pub envelopes_per_sec: f64,
    pub bytes_per_sec: f64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection_at(ts: Instant, received: u64, frames: u64) -> CollectedMetrics {
        CollectedMetrics {
            timestamp: Some(ts),
            pipeline: Some(PipelineSnapshot {
                envelopes_received: received,
                ..Default::default()
            }),
            servers: Vec::new(),
            receivers: vec![CollectedReceiver {
                id: "grpc-log".into(),
                receiver_type: "grpc_native_log".into(),
                snapshot: ReceiverMetricsSnapshot {
                    frames_received: frames,
                    ..Default::default()
                },
            }],
            forwarders: Vec::new(),
        }
    }

    #[test]
    fn test_rates_between_collections() {
        let start = Instant::now();
        let prev = collection_at(start, 100, 10);
        let current = collection_at(start + Duration::from_secs(10), 1100, 110);

        let rates = current.rates(&prev).unwrap();
        assert_eq!(rates.elapsed, Duration::from_secs(10));
        assert_eq!(rates.pipeline.unwrap().received_per_sec, 100.0);
        assert_eq!(rates.receivers[0].frames_per_sec, 10.0);
    }

    #[test]
    fn test_rates_require_elapsed_time() {
        let now = Instant::now();
        let a = collection_at(now, 1, 1);
        let b = collection_at(now, 2, 2);
        assert!(b.rates(&a).is_none());
        assert!(CollectedMetrics::default().rates(&a).is_none());
    }
}
