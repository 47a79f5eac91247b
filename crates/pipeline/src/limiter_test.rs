use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::time::sleep;

use super::*;

/// Flush target with a fixed pending count that records every flush
#[derive(Default)]
struct CountingTarget {
    pending: AtomicUsize,
    flushes: AtomicUsize,
}

impl CountingTarget {
    fn with_pending(pending: usize) -> Arc<Self> {
        let target = Arc::new(Self::default());
        target.pending.store(pending, Ordering::SeqCst);
        target
    }

    fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlushTarget for CountingTarget {
    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    async fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

fn start(config: LimiterConfig, target: &Arc<CountingTarget>) -> (Limiter, CancellationToken) {
    let parent = CancellationToken::new();
    let limiter = Limiter::start(config, Arc::clone(target) as Arc<dyn FlushTarget>, &parent)
        .unwrap();
    (limiter, parent)
}

// ============================================================================
// Triggers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_size_trigger_flushes_promptly() {
    let target = CountingTarget::with_pending(5);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_secs(5), 5), &target);

    assert!(limiter.check());
    sleep(Duration::from_millis(999)).await;

    assert_eq!(target.flushes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_size_not_reached_does_not_flush() {
    let target = CountingTarget::with_pending(2);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_secs(5), 5), &target);

    assert!(!limiter.check());
    sleep(Duration::from_secs(1)).await;

    assert_eq!(target.flushes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_time_trigger() {
    let target = CountingTarget::with_pending(1);
    let (_limiter, _parent) = start(LimiterConfig::new(Duration::from_millis(100), 5), &target);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(target.flushes(), 0);

    sleep(Duration::from_millis(150)).await;
    assert!(target.flushes() >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_time_trigger_flushes_when_empty() {
    let target = CountingTarget::with_pending(0);
    let (_limiter, _parent) = start(LimiterConfig::new(Duration::from_millis(100), 5), &target);

    sleep(Duration::from_millis(350)).await;
    assert_eq!(target.flushes(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_limit_disables_size_trigger() {
    let target = CountingTarget::with_pending(1_000);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_secs(60), 0), &target);

    assert!(!limiter.check());
    sleep(Duration::from_secs(1)).await;
    assert_eq!(target.flushes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_size_flush_resets_timer() {
    let target = CountingTarget::with_pending(5);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_millis(100), 5), &target);

    sleep(Duration::from_millis(80)).await;
    assert!(limiter.check());
    sleep(Duration::from_millis(10)).await;
    assert_eq!(target.flushes(), 1);

    // Timer restarted at ~80ms, so nothing fires at the original 100ms mark
    sleep(Duration::from_millis(50)).await;
    assert_eq!(target.flushes(), 1);

    sleep(Duration::from_millis(60)).await;
    assert_eq!(target.flushes(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_checks_collapse() {
    let target = CountingTarget::with_pending(5);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_secs(60), 5), &target);

    let queued = (0..10).filter(|_| limiter.check()).count();
    assert_eq!(queued, 1);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(target.flushes(), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_zero_period_rejected() {
    let target: Arc<dyn FlushTarget> = CountingTarget::with_pending(0);
    let parent = CancellationToken::new();
    let result = Limiter::start(LimiterConfig::new(Duration::ZERO, 5), target, &parent);
    assert!(matches!(result, Err(PipelineError::InvalidLimiter(_))));
}

#[tokio::test(start_paused = true)]
async fn test_stop_flushes_exactly_once() {
    let target = CountingTarget::with_pending(0);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_secs(3600), 0), &target);

    limiter.stop().await;
    assert_eq!(target.flushes(), 1);
    assert!(limiter.is_stopped());

    limiter.stop().await;
    assert_eq!(target.flushes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_flushes_exactly_once() {
    let target = CountingTarget::with_pending(0);
    let (limiter, parent) = start(LimiterConfig::new(Duration::from_secs(3600), 0), &target);

    parent.cancel();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(target.flushes(), 1);

    limiter.stop().await;
    assert_eq!(target.flushes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_check_after_stop_is_harmless() {
    let target = CountingTarget::with_pending(10);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_secs(1), 1), &target);

    limiter.stop().await;
    limiter.check();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(target.flushes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_worker() {
    let target = CountingTarget::with_pending(0);
    let (limiter, _parent) = start(LimiterConfig::new(Duration::from_secs(3600), 0), &target);

    drop(limiter);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(target.flushes(), 1);
}
