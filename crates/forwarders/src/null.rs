//! Null forwarder - acknowledges and discards every batch
//!
//! Useful for muting one event type or for exercising the pipeline
//! without an upstream collector.

use std::sync::Arc;

use async_trait::async_trait;
use satellite_metrics::ForwarderMetrics;
use satellite_pipeline::{ForwardError, Forwarder};
use satellite_protocol::{Envelope, EventType};

pub struct NullForwarder {
    name: String,
    event_type: EventType,
    metrics: Arc<ForwarderMetrics>,
}

impl NullForwarder {
    pub fn new(name: impl Into<String>, event_type: EventType) -> Self {
        Self {
            name: name.into(),
            event_type,
            metrics: Arc::new(ForwarderMetrics::new()),
        }
    }

    pub(crate) fn metrics(&self) -> &Arc<ForwarderMetrics> {
        &self.metrics
    }
}

#[async_trait]
impl Forwarder for NullForwarder {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward_type(&self) -> EventType {
        self.event_type
    }

    async fn forward(&self, batch: &[Envelope]) -> Result<(), ForwardError> {
        let bytes = batch.iter().map(|e| e.payload().encoded_len() as u64).sum();
        self.metrics.record_batch(batch.len() as u64, bytes);
        Ok(())
    }
}
