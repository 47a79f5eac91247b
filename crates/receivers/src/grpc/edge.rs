//! Edge batching for Envoy metrics streams
//!
//! Envoy pushes one small message per flush interval on a long-lived
//! stream. Rather than emit an envelope per message, each stream keeps a
//! local queue driven by its own limiter and emits one list envelope per
//! flush. The queue holds at most twice the limit; reaching that bound
//! flushes inline before the next frame is read.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use satellite_pipeline::{FlushTarget, Limiter, LimiterConfig};
use satellite_protocol::proto::StreamMetricsMessage;
use satellite_protocol::rpc::Status;
use satellite_protocol::{EventType, Payload};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::receiver::{ChannelClosed, ReceiverContext};

struct EdgeQueue {
    ctx: Arc<ReceiverContext>,
    event_type: EventType,
    items: Mutex<Vec<StreamMetricsMessage>>,
    /// Serializes drains so batches leave in arrival order
    emit: tokio::sync::Mutex<()>,
}

impl EdgeQueue {
    async fn drain(&self) -> Result<(), ChannelClosed> {
        let _emit = self.emit.lock().await;
        let items = std::mem::take(&mut *self.items.lock());
        if items.is_empty() {
            return Ok(());
        }
        let payload = match self.event_type {
            EventType::EnvoyMetricsV2 => Payload::EnvoyMetricsV2(items),
            _ => Payload::EnvoyMetricsV3(items),
        };
        self.ctx.emit(payload).await
    }
}

#[async_trait]
impl FlushTarget for EdgeQueue {
    fn pending(&self) -> usize {
        self.items.lock().len()
    }

    async fn flush(&self) {
        if self.drain().await.is_err() {
            warn!(receiver = %self.ctx.name, "pipeline closed, dropping edge batch");
        }
    }
}

/// Stream-scoped batcher
pub(crate) struct EdgeBatcher {
    queue: Arc<EdgeQueue>,
    limiter: Limiter,
    capacity: usize,
}

impl EdgeBatcher {
    pub fn start(
        ctx: Arc<ReceiverContext>,
        event_type: EventType,
        config: LimiterConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, Status> {
        let capacity = config.limit_count.saturating_mul(2).max(1);
        let queue = Arc::new(EdgeQueue {
            ctx,
            event_type,
            items: Mutex::new(Vec::with_capacity(capacity)),
            emit: tokio::sync::Mutex::new(()),
        });
        let limiter = Limiter::start(config, Arc::clone(&queue) as Arc<dyn FlushTarget>, cancel)
            .map_err(|e| Status::internal(e.to_string()))?;
        Ok(Self {
            queue,
            limiter,
            capacity,
        })
    }

    /// Queue one message, flushing inline when the queue is full
    pub async fn push(&self, message: StreamMetricsMessage) -> Result<(), ChannelClosed> {
        let len = {
            let mut items = self.queue.items.lock();
            items.push(message);
            items.len()
        };
        if len >= self.capacity {
            return self.queue.drain().await;
        }
        self.limiter.check();
        Ok(())
    }

    /// Stop the limiter; its final flush emits whatever is left
    pub async fn finish(self) {
        self.limiter.stop().await;
    }
}
