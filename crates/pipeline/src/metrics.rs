//! Pipeline metrics
//!
//! Atomic counters shared by the fan-in readers and every lane. All
//! operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

use satellite_metrics::PipelineSnapshot;

/// Counters for the whole pipeline
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    envelopes_received: AtomicU64,
    envelopes_unrouted: AtomicU64,
    envelopes_buffered: AtomicU64,
    buffer_overflows: AtomicU64,
    envelopes_malformed: AtomicU64,
    flushes: AtomicU64,
    batches_forwarded: AtomicU64,
    envelopes_forwarded: AtomicU64,
    batches_failed: AtomicU64,
    batches_dropped: AtomicU64,
    envelopes_dropped: AtomicU64,
    retries: AtomicU64,
}

impl PipelineMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            envelopes_received: AtomicU64::new(0),
            envelopes_unrouted: AtomicU64::new(0),
            envelopes_buffered: AtomicU64::new(0),
            buffer_overflows: AtomicU64::new(0),
            envelopes_malformed: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            batches_forwarded: AtomicU64::new(0),
            envelopes_forwarded: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
            envelopes_dropped: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Envelope read from a receiver channel
    #[inline]
    pub fn record_received(&self) {
        self.envelopes_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Envelope with no lane for its type
    #[inline]
    pub fn record_unrouted(&self) {
        self.envelopes_unrouted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_buffered(&self) {
        self.envelopes_buffered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_overflow(&self) {
        self.buffer_overflows.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_malformed(&self) {
        self.envelopes_malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Batch acknowledged by its forwarder
    #[inline]
    pub fn record_forwarded(&self, envelopes: u64) {
        self.batches_forwarded.fetch_add(1, Ordering::Relaxed);
        self.envelopes_forwarded
            .fetch_add(envelopes, Ordering::Relaxed);
    }

    /// One failed forward attempt
    #[inline]
    pub fn record_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Batch abandoned after the fallback policy ran out
    #[inline]
    pub fn record_dropped(&self, envelopes: u64) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
        self.envelopes_dropped
            .fetch_add(envelopes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            envelopes_received: self.envelopes_received.load(Ordering::Relaxed),
            envelopes_unrouted: self.envelopes_unrouted.load(Ordering::Relaxed),
            envelopes_buffered: self.envelopes_buffered.load(Ordering::Relaxed),
            buffer_overflows: self.buffer_overflows.load(Ordering::Relaxed),
            envelopes_malformed: self.envelopes_malformed.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            batches_forwarded: self.batches_forwarded.load(Ordering::Relaxed),
            envelopes_forwarded: self.envelopes_forwarded.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            envelopes_dropped: self.envelopes_dropped.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Overflow Tracker - rate-limited logging of buffer overflows
// ============================================================================

/// Aggregates overflow drops and logs one summary per second
///
/// - any drops in the last second: WARN
/// - more than 100 drops in the last second: ERROR (upstream cannot keep up)
pub struct OverflowTracker {
    lane: String,
    interval_drops: AtomicU64,
    last_log_ms: AtomicU64,
}

const LOG_INTERVAL_MS: u64 = 1000;
const CRITICAL_DROP_THRESHOLD: u64 = 100;

impl OverflowTracker {
    pub fn new(lane: impl Into<String>) -> Self {
        Self {
            lane: lane.into(),
            interval_drops: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(now_ms()),
        }
    }

    /// Record one dropped envelope; returns true if a summary was logged
    pub fn record_drop(&self) -> bool {
        self.interval_drops.fetch_add(1, Ordering::Relaxed);
        self.maybe_log()
    }

    fn maybe_log(&self) -> bool {
        let now = now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);

        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Only one caller wins the slot for this interval
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let drops = self.interval_drops.swap(0, Ordering::Relaxed);
        if drops == 0 {
            return false;
        }

        if drops > CRITICAL_DROP_THRESHOLD {
            tracing::error!(
                forwarder = %self.lane,
                dropped_envelopes = drops,
                threshold = CRITICAL_DROP_THRESHOLD,
                "batch buffer overflowing, upstream cannot keep up"
            );
        } else {
            tracing::warn!(
                forwarder = %self.lane,
                dropped_envelopes = drops,
                "batch buffer full, envelopes dropped in last second"
            );
        }

        true
    }

    #[cfg(test)]
    pub fn current_drops(&self) -> u64 {
        self.interval_drops.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for OverflowTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverflowTracker")
            .field("lane", &self.lane)
            .field(
                "interval_drops",
                &self.interval_drops.load(Ordering::Relaxed),
            )
            .finish()
    }
}

#[inline]
fn now_ms() -> u64 {
    satellite_protocol::now_ms().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_at_zero() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.snapshot(), PipelineSnapshot::default());
    }

    #[test]
    fn test_forwarded_and_dropped() {
        let metrics = PipelineMetrics::new();
        metrics.record_forwarded(10);
        metrics.record_forwarded(5);
        metrics.record_failed();
        metrics.record_retry();
        metrics.record_dropped(3);

        let s = metrics.snapshot();
        assert_eq!(s.batches_forwarded, 2);
        assert_eq!(s.envelopes_forwarded, 15);
        assert_eq!(s.batches_failed, 1);
        assert_eq!(s.retries, 1);
        assert_eq!(s.batches_dropped, 1);
        assert_eq!(s.envelopes_dropped, 3);
    }

    #[test]
    fn test_concurrent_received() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(PipelineMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.record_received();
                        m.record_buffered();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let s = metrics.snapshot();
        assert_eq!(s.envelopes_received, 4000);
        assert_eq!(s.envelopes_buffered, 4000);
    }

    #[test]
    fn test_overflow_tracker_aggregates_within_interval() {
        let tracker = OverflowTracker::new("native-log");
        assert!(!tracker.record_drop());
        assert!(!tracker.record_drop());
        assert_eq!(tracker.current_drops(), 2);
    }

    #[test]
    fn test_overflow_tracker_debug() {
        let tracker = OverflowTracker::new("native-log");
        let debug = format!("{tracker:?}");
        assert!(debug.contains("OverflowTracker"));
        assert!(debug.contains("native-log"));
    }
}
