//! Metrics provider traits
//!
//! Receivers, forwarders, servers and the pipeline expose their counters
//! through these traits so the reporter can collect them without knowing
//! the concrete types.
//!
//! # Design
//!
//! - Traits use `&self` for zero-copy metric access
//! - All providers are `Send + Sync` for thread-safe collection
//! - Metric structs use atomics internally, so no locks needed

use std::sync::atomic::{AtomicU64, Ordering};

use crate::PipelineSnapshot;

/// Counters shared by every receiver
#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    /// Streams currently open
    pub streams_active: AtomicU64,
    /// Streams accepted since start
    pub streams_total: AtomicU64,
    /// Inbound protocol frames
    pub frames_received: AtomicU64,
    /// Inbound payload bytes
    pub bytes_received: AtomicU64,
    /// Envelopes handed to the pipeline
    pub envelopes_emitted: AtomicU64,
    /// Frames that failed to decode
    pub decode_errors: AtomicU64,
    /// Sync invokes issued
    pub sync_invokes: AtomicU64,
    /// Sync invokes that failed
    pub sync_failures: AtomicU64,
}

impl ReceiverMetrics {
    pub const fn new() -> Self {
        Self {
            streams_active: AtomicU64::new(0),
            streams_total: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            envelopes_emitted: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            sync_invokes: AtomicU64::new(0),
            sync_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn stream_opened(&self) {
        self.streams_active.fetch_add(1, Ordering::Relaxed);
        self.streams_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn stream_closed(&self) {
        self.streams_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_received(&self, bytes: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn envelope_emitted(&self) {
        self.envelopes_emitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn sync_invoked(&self, ok: bool) {
        self.sync_invokes.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.sync_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ReceiverMetricsSnapshot {
        ReceiverMetricsSnapshot {
            streams_active: self.streams_active.load(Ordering::Relaxed),
            streams_total: self.streams_total.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            envelopes_emitted: self.envelopes_emitted.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            sync_invokes: self.sync_invokes.load(Ordering::Relaxed),
            sync_failures: self.sync_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of receiver metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReceiverMetricsSnapshot {
    pub streams_active: u64,
    pub streams_total: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub envelopes_emitted: u64,
    pub decode_errors: u64,
    pub sync_invokes: u64,
    pub sync_failures: u64,
}

/// Trait for receivers to provide metrics to the reporter
pub trait ReceiverMetricsProvider: Send + Sync {
    /// Configured receiver name
    fn receiver_id(&self) -> &str;

    /// Receiver kind (e.g., "grpc_native_log", "http_native_log")
    fn receiver_type(&self) -> &str;

    fn snapshot(&self) -> ReceiverMetricsSnapshot;
}

/// Counters shared by every forwarder
#[derive(Debug, Default)]
pub struct ForwarderMetrics {
    /// Batches delivered upstream
    pub batches_sent: AtomicU64,
    /// Envelopes delivered upstream
    pub envelopes_sent: AtomicU64,
    /// Payload bytes delivered upstream
    pub bytes_sent: AtomicU64,
    /// Failed sends (per item for unary, per batch for streams)
    pub send_errors: AtomicU64,
    /// Sync forwards issued
    pub sync_calls: AtomicU64,
    /// Sync forwards that failed
    pub sync_errors: AtomicU64,
}

impl ForwarderMetrics {
    pub const fn new() -> Self {
        Self {
            batches_sent: AtomicU64::new(0),
            envelopes_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            sync_calls: AtomicU64::new(0),
            sync_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_batch(&self, envelopes: u64, bytes: u64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.envelopes_sent.fetch_add(envelopes, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sync(&self, ok: bool) {
        self.sync_calls.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.sync_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ForwarderMetricsSnapshot {
        ForwarderMetricsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            envelopes_sent: self.envelopes_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            sync_calls: self.sync_calls.load(Ordering::Relaxed),
            sync_errors: self.sync_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of forwarder metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ForwarderMetricsSnapshot {
    pub batches_sent: u64,
    pub envelopes_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
    pub sync_calls: u64,
    pub sync_errors: u64,
}

/// Trait for forwarders to provide metrics to the reporter
pub trait ForwarderMetricsProvider: Send + Sync {
    /// Configured forwarder name
    fn forwarder_id(&self) -> &str;

    /// Event type the forwarder accepts
    fn forwarder_type(&self) -> &str;

    fn snapshot(&self) -> ForwarderMetricsSnapshot;
}

/// Point-in-time snapshot of a transport server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ServerMetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub requests_total: u64,
    pub requests_rejected: u64,
    pub errors: u64,
}

/// Trait for transport servers (RPC, HTTP) to provide metrics
pub trait ServerMetricsProvider: Send + Sync {
    /// Server kind ("grpc", "http")
    fn server_type(&self) -> &str;

    fn snapshot(&self) -> ServerMetricsSnapshot;
}

/// Trait for the pipeline to provide metrics
pub trait PipelineMetricsProvider: Send + Sync {
    fn pipeline_snapshot(&self) -> PipelineSnapshot;
}
