//! Forwarder-backed `SyncInvoker`
//!
//! Dispatches a sync request to the forwarder registered for the envelope's
//! type and hands its response (and server stream, if any) back verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use satellite_protocol::{Envelope, EventType, InvokeError, SyncInvoker, SyncResponse};

use crate::forwarder::Forwarder;

#[derive(Clone, Default)]
pub struct ForwarderSyncInvoker {
    forwarders: HashMap<EventType, Arc<dyn Forwarder>>,
}

impl ForwarderSyncInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, forwarder: Arc<dyn Forwarder>) {
        self.forwarders.insert(forwarder.forward_type(), forwarder);
    }

    /// Event types that can be answered synchronously
    pub fn sync_types(&self) -> Vec<EventType> {
        let mut types: Vec<_> = self
            .forwarders
            .values()
            .filter(|f| f.supports_sync_invoke())
            .map(|f| f.forward_type())
            .collect();
        types.sort();
        types
    }
}

#[async_trait]
impl SyncInvoker for ForwarderSyncInvoker {
    async fn sync_invoke(&self, envelope: Envelope) -> Result<SyncResponse, InvokeError> {
        let event_type = envelope.event_type();
        let forwarder = self
            .forwarders
            .get(&event_type)
            .ok_or(InvokeError::NoForwarder(event_type))?;
        if !forwarder.supports_sync_invoke() {
            return Err(InvokeError::Unsupported(event_type));
        }

        tracing::debug!(
            forwarder = %forwarder.name(),
            event_type = %event_type,
            "sync invoke"
        );

        forwarder.sync_forward(envelope).await.map_err(|e| {
            tracing::warn!(
                forwarder = %forwarder.name(),
                event_type = %event_type,
                error = %e,
                "sync forward failed"
            );
            e.into_invoke_error()
        })
    }
}

impl std::fmt::Debug for ForwarderSyncInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwarderSyncInvoker")
            .field("sync_types", &self.sync_types())
            .finish()
    }
}
