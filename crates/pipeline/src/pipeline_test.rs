use std::result::Result;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use satellite_protocol::rpc::RpcError;
use satellite_protocol::{Bytes, InvokeError, Payload, SyncResponse};
use tokio::time::sleep;

use super::*;
use crate::forwarder::ForwardError;

/// Forwarder that records batches and fails the first `failures` calls
struct RecordingForwarder {
    name: String,
    event_type: EventType,
    sync: bool,
    failures: AtomicUsize,
    batches: Mutex<Vec<Vec<Envelope>>>,
}

impl RecordingForwarder {
    fn new(event_type: EventType) -> Arc<Self> {
        Self::failing(event_type, 0)
    }

    fn failing(event_type: EventType, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            name: format!("{event_type}-forwarder"),
            event_type,
            sync: false,
            failures: AtomicUsize::new(failures),
            batches: Mutex::new(Vec::new()),
        })
    }

    fn sync(event_type: EventType) -> Arc<Self> {
        Arc::new(Self {
            name: format!("{event_type}-sync"),
            event_type,
            sync: true,
            failures: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        })
    }

    fn batches(&self) -> Vec<Vec<Envelope>> {
        self.batches.lock().clone()
    }

    fn bodies(&self) -> Vec<Bytes> {
        self.batches
            .lock()
            .iter()
            .flatten()
            .flat_map(|e| e.payload().to_frames())
            .collect()
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward_type(&self) -> EventType {
        self.event_type
    }

    fn supports_sync_invoke(&self) -> bool {
        self.sync
    }

    async fn forward(&self, batch: &[Envelope]) -> Result<(), ForwardError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ForwardError::Transport(RpcError::Closed));
        }
        self.batches.lock().push(batch.to_vec());
        Ok(())
    }

    async fn sync_forward(&self, envelope: Envelope) -> Result<SyncResponse, ForwardError> {
        if !self.sync {
            return Err(ForwardError::SyncUnsupported(self.event_type));
        }
        let mut frames = envelope.payload().to_frames();
        frames.push(Bytes::from_static(b"-answered"));
        Ok(SyncResponse::unary(Envelope::synthesized(
            "upstream",
            Payload::Opaque(frames),
        )))
    }
}

fn log(body: &'static [u8]) -> Envelope {
    Envelope::new("test", Payload::Log(Bytes::from_static(body)))
}

fn lane_config(limit_count: usize, capacity: usize, fallback: FallbackPolicy) -> LaneConfig {
    LaneConfig {
        buffer_capacity: capacity,
        limiter: LimiterConfig::new(Duration::from_secs(3600), limit_count),
        fallback,
    }
}

fn build(config: LaneConfig, forwarders: Vec<Arc<RecordingForwarder>>) -> Pipeline {
    let mut builder = PipelineBuilder::new(config);
    for forwarder in forwarders {
        builder.add_forwarder(forwarder).unwrap();
    }
    builder.build().unwrap()
}

// ============================================================================
// Wiring
// ============================================================================

#[tokio::test]
async fn test_duplicate_forwarder_rejected() {
    let mut builder = PipelineBuilder::new(LaneConfig::default());
    builder
        .add_forwarder(RecordingForwarder::new(EventType::Log))
        .unwrap();
    let err = builder
        .add_forwarder(RecordingForwarder::new(EventType::Log))
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::DuplicateForwarder { .. }));
}

#[tokio::test]
async fn test_zero_period_rejected_at_build() {
    let mut config = LaneConfig::default();
    config.limiter.flush_period = Duration::ZERO;
    let mut builder = PipelineBuilder::new(config);
    builder
        .add_forwarder(RecordingForwarder::new(EventType::Log))
        .unwrap();
    assert!(matches!(
        builder.build(),
        Err(PipelineError::InvalidLimiter(_))
    ));
}

#[tokio::test]
async fn test_event_types_sorted() {
    let pipeline = build(
        LaneConfig::default(),
        vec![
            RecordingForwarder::new(EventType::Meter),
            RecordingForwarder::new(EventType::Segment),
        ],
    );
    assert_eq!(pipeline.event_types(), vec![EventType::Segment, EventType::Meter]);
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

// ============================================================================
// Forwarding
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_size_trigger_forwards_in_order() {
    let forwarder = RecordingForwarder::new(EventType::Log);
    let mut pipeline = build(lane_config(3, 100, FallbackPolicy::Drop), vec![Arc::clone(&forwarder)]);

    let (tx, rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("native-log", rx);

    for body in [b"a".as_slice(), b"b", b"c"] {
        tx.send(Envelope::new("test", Payload::Log(Bytes::copy_from_slice(body))))
            .await
            .unwrap();
    }
    sleep(Duration::from_millis(10)).await;

    let batches = forwarder.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        forwarder.bodies(),
        vec![Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"c")]
    );

    let s = pipeline.metrics().snapshot();
    assert_eq!(s.envelopes_received, 3);
    assert_eq!(s.envelopes_forwarded, 3);
    assert_eq!(s.batches_forwarded, 1);
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_fan_in_from_many_receivers() {
    let logs = RecordingForwarder::new(EventType::Log);
    let segments = RecordingForwarder::new(EventType::Segment);
    let mut pipeline = build(
        lane_config(0, 100, FallbackPolicy::Drop),
        vec![Arc::clone(&logs), Arc::clone(&segments)],
    );

    let (log_tx, log_rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    let (seg_tx, seg_rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("grpc-log", log_rx);
    pipeline.attach("tracing", seg_rx);

    log_tx.send(log(b"l1")).await.unwrap();
    seg_tx
        .send(Envelope::new("test", Payload::Segment(Bytes::from_static(b"s1"))))
        .await
        .unwrap();
    log_tx.send(log(b"l2")).await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(pipeline.pending(EventType::Log), Some(2));
    assert_eq!(pipeline.pending(EventType::Segment), Some(1));

    drop(log_tx);
    drop(seg_tx);
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(logs.bodies().len(), 2);
    assert_eq!(segments.bodies(), vec![Bytes::from_static(b"s1")]);
}

#[tokio::test(start_paused = true)]
async fn test_unrouted_envelope_counted() {
    let mut pipeline = build(
        LaneConfig::default(),
        vec![RecordingForwarder::new(EventType::Log)],
    );
    let (tx, rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("meter", rx);

    tx.send(Envelope::new("test", Payload::Meter(Bytes::from_static(b"m"))))
        .await
        .unwrap();
    sleep(Duration::from_millis(10)).await;

    let s = pipeline.metrics().snapshot();
    assert_eq!(s.envelopes_received, 1);
    assert_eq!(s.envelopes_unrouted, 1);
    assert_eq!(s.envelopes_buffered, 0);
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_remaining() {
    let forwarder = RecordingForwarder::new(EventType::Log);
    let mut pipeline = build(lane_config(0, 100, FallbackPolicy::Drop), vec![Arc::clone(&forwarder)]);
    let (tx, rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("native-log", rx);

    tx.send(log(b"1")).await.unwrap();
    tx.send(log(b"2")).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert!(forwarder.batches().is_empty());

    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(forwarder.batches().len(), 1);
    assert_eq!(forwarder.bodies().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_overflow_drops_newest() {
    let forwarder = RecordingForwarder::new(EventType::Log);
    let mut pipeline = build(lane_config(0, 2, FallbackPolicy::Drop), vec![Arc::clone(&forwarder)]);
    let (tx, rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("native-log", rx);

    for body in [b"1".as_slice(), b"2", b"3", b"4", b"5"] {
        tx.send(Envelope::new("test", Payload::Log(Bytes::copy_from_slice(body))))
            .await
            .unwrap();
    }
    sleep(Duration::from_millis(10)).await;
    assert_eq!(pipeline.metrics().snapshot().buffer_overflows, 3);

    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(
        forwarder.bodies(),
        vec![Bytes::from_static(b"1"), Bytes::from_static(b"2")]
    );
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_drop_fallback_discards_failed_batch() {
    let forwarder = RecordingForwarder::failing(EventType::Log, 1);
    let mut pipeline = build(lane_config(1, 100, FallbackPolicy::Drop), vec![Arc::clone(&forwarder)]);
    let (tx, rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("native-log", rx);

    tx.send(log(b"lost")).await.unwrap();
    sleep(Duration::from_millis(10)).await;

    let s = pipeline.metrics().snapshot();
    assert_eq!(s.batches_failed, 1);
    assert_eq!(s.batches_dropped, 1);
    assert_eq!(s.envelopes_dropped, 1);
    assert_eq!(s.retries, 0);

    tx.send(log(b"kept")).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(forwarder.bodies(), vec![Bytes::from_static(b"kept")]);
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_retry_once_recovers() {
    let forwarder = RecordingForwarder::failing(EventType::Log, 1);
    let fallback = FallbackPolicy::RetryOnce {
        backoff: Duration::from_millis(200),
    };
    let mut pipeline = build(lane_config(1, 100, fallback), vec![Arc::clone(&forwarder)]);
    let (tx, rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("native-log", rx);

    tx.send(log(b"second-chance")).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert!(forwarder.batches().is_empty());

    sleep(Duration::from_millis(150)).await;
    assert_eq!(forwarder.bodies(), vec![Bytes::from_static(b"second-chance")]);

    let s = pipeline.metrics().snapshot();
    assert_eq!(s.retries, 1);
    assert_eq!(s.batches_failed, 1);
    assert_eq!(s.batches_forwarded, 1);
    assert_eq!(s.batches_dropped, 0);
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_retry_once_then_drop() {
    let forwarder = RecordingForwarder::failing(EventType::Log, 2);
    let fallback = FallbackPolicy::RetryOnce {
        backoff: Duration::from_millis(50),
    };
    let mut pipeline = build(lane_config(1, 100, fallback), vec![Arc::clone(&forwarder)]);
    let (tx, rx) = crossfire::mpsc::bounded_async::<Envelope>(1);
    pipeline.attach("native-log", rx);

    tx.send(log(b"doomed")).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    let s = pipeline.metrics().snapshot();
    assert_eq!(s.retries, 1);
    assert_eq!(s.batches_failed, 2);
    assert_eq!(s.batches_dropped, 1);
    assert!(forwarder.batches().is_empty());
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

// ============================================================================
// Sync invoke
// ============================================================================

#[tokio::test]
async fn test_sync_invoke_returns_forwarder_bytes() {
    let pipeline = build(
        LaneConfig::default(),
        vec![RecordingForwarder::sync(EventType::ProfileTaskQuery)],
    );
    let invoker = pipeline.sync_invoker();

    let request = Envelope::new(
        "test",
        Payload::ProfileTaskQuery(Bytes::from_static(b"query")),
    );
    let response = invoker.sync_invoke(request).await.unwrap();
    assert!(response.stream.is_none());
    assert_eq!(
        response.envelope.payload(),
        &Payload::Opaque(vec![Bytes::from_static(b"query"), Bytes::from_static(b"-answered")])
    );
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_sync_invoke_without_forwarder() {
    let pipeline = build(LaneConfig::default(), vec![]);
    let err = pipeline
        .sync_invoker()
        .sync_invoke(Envelope::new(
            "test",
            Payload::ProfileTaskQuery(Bytes::new()),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::NoForwarder(EventType::ProfileTaskQuery)));
}

#[tokio::test]
async fn test_sync_invoke_unsupported() {
    let pipeline = build(
        LaneConfig::default(),
        vec![RecordingForwarder::new(EventType::Log)],
    );
    let err = pipeline
        .sync_invoker()
        .sync_invoke(log(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::Unsupported(EventType::Log)));
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_sync_invokes() {
    let pipeline = build(
        LaneConfig::default(),
        vec![RecordingForwarder::sync(EventType::ProfileTaskQuery)],
    );
    let invoker = pipeline.sync_invoker();

    let calls = (0..8u8).map(|i| {
        let invoker = Arc::clone(&invoker);
        tokio::spawn(async move {
            let body = Bytes::from(vec![i]);
            let request = Envelope::new("test", Payload::ProfileTaskQuery(body.clone()));
            let response = invoker.sync_invoke(request).await.unwrap();
            (body, response.envelope.payload().to_frames())
        })
    });
    for call in calls.collect::<Vec<_>>() {
        let (body, frames) = call.await.unwrap();
        assert_eq!(frames[0], body);
    }
    pipeline.shutdown(Duration::from_secs(1)).await.unwrap();
}
