//! Receiver contract
//!
//! A receiver terminates one family of agent protocols. It registers its
//! handlers on a server, optionally takes a `SyncInvoker` for calls that
//! need an upstream answer, and hands every decoded message to the
//! pipeline through its output channel.

use std::sync::{Arc, OnceLock};

use crossfire::{AsyncRx, MAsyncTx};
use parking_lot::Mutex;
use satellite_config::{ReceiverConfig, ReceiverKind};
use satellite_metrics::{ReceiverMetrics, ReceiverMetricsProvider, ReceiverMetricsSnapshot};
use satellite_protocol::{
    Envelope, EventType, InvokeError, METADATA_RECEIVER, Payload, SyncInvoker, SyncResponse,
};

use crate::grpc::GrpcReceiver;
use crate::http_log::HttpLogReceiver;
use crate::server::Server;
use crate::Result;

/// Output channel capacity; the pipeline applies backpressure through it
pub const OUTPUT_CHANNEL_CAPACITY: usize = 1;

/// Agent-facing protocol receiver
pub trait Receiver: Send + Sync {
    /// Configured instance name
    fn name(&self) -> &str;

    fn kind(&self) -> ReceiverKind;

    fn show_name(&self) -> &'static str {
        self.kind().show_name()
    }

    fn description(&self) -> &'static str {
        self.kind().description()
    }

    /// Sample configuration block
    fn default_config(&self) -> String {
        self.kind().default_config()
    }

    /// Event types this receiver produces, one forwarder needed per type
    fn supported_forwarders(&self) -> &'static [EventType] {
        self.kind().event_types()
    }

    /// Mount handlers on a server; fails if the server kind is wrong
    fn register_handler(&self, server: &mut Server) -> Result<()>;

    /// Hand over the invoker used for calls answered by the upstream
    fn register_sync_invoker(&self, _invoker: Arc<dyn SyncInvoker>) {}

    /// Take the output channel; `None` after the first call
    fn channel(&self) -> Option<AsyncRx<Envelope>>;

    fn metrics_handle(&self) -> ReceiverMetricsHandle;
}

/// Build the receiver for a configuration entry
pub fn build_receiver(config: &ReceiverConfig) -> Box<dyn Receiver> {
    match config.kind {
        ReceiverKind::HttpNativeLog => Box::new(HttpLogReceiver::new(config)),
        _ => Box::new(GrpcReceiver::new(config)),
    }
}

/// State shared by a receiver and the handlers it registers
pub(crate) struct ReceiverContext {
    pub name: String,
    pub kind: ReceiverKind,
    sender: MAsyncTx<Envelope>,
    receiver: Mutex<Option<AsyncRx<Envelope>>>,
    invoker: OnceLock<Arc<dyn SyncInvoker>>,
    pub metrics: Arc<ReceiverMetrics>,
}

/// Output channel was closed by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelClosed;

impl ReceiverContext {
    pub fn new(name: impl Into<String>, kind: ReceiverKind) -> Self {
        let (sender, receiver) = crossfire::mpsc::bounded_async::<Envelope>(OUTPUT_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            kind,
            sender,
            receiver: Mutex::new(Some(receiver)),
            invoker: OnceLock::new(),
            metrics: Arc::new(ReceiverMetrics::new()),
        }
    }

    /// Wrap a payload in an envelope tagged with this receiver
    pub fn envelope(&self, payload: Payload) -> Envelope {
        Envelope::new(self.kind.as_str(), payload).with_metadata(METADATA_RECEIVER, &self.name)
    }

    /// Send a payload down the output channel, waiting for capacity
    pub async fn emit(&self, payload: Payload) -> std::result::Result<(), ChannelClosed> {
        let envelope = self.envelope(payload);
        self.sender.send(envelope).await.map_err(|_| ChannelClosed)?;
        self.metrics.envelope_emitted();
        Ok(())
    }

    pub fn take_channel(&self) -> Option<AsyncRx<Envelope>> {
        self.receiver.lock().take()
    }

    pub fn set_invoker(&self, invoker: Arc<dyn SyncInvoker>) {
        if self.invoker.set(invoker).is_err() {
            tracing::warn!(receiver = %self.name, "sync invoker already registered, ignoring");
        }
    }

    /// Hand a request to the upstream and wait for its answer
    pub async fn sync_invoke(
        &self,
        payload: Payload,
    ) -> std::result::Result<SyncResponse, InvokeError> {
        let invoker = self.invoker.get().ok_or(InvokeError::NotRegistered)?;
        let result = invoker.sync_invoke(self.envelope(payload)).await;
        self.metrics.sync_invoked(result.is_ok());
        result
    }

    pub fn metrics_handle(&self) -> ReceiverMetricsHandle {
        ReceiverMetricsHandle {
            name: self.name.clone(),
            kind: self.kind,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Handle for the metrics reporter
pub struct ReceiverMetricsHandle {
    name: String,
    kind: ReceiverKind,
    metrics: Arc<ReceiverMetrics>,
}

impl ReceiverMetricsProvider for ReceiverMetricsHandle {
    fn receiver_id(&self) -> &str {
        &self.name
    }

    fn receiver_type(&self) -> &str {
        self.kind.as_str()
    }

    fn snapshot(&self) -> ReceiverMetricsSnapshot {
        self.metrics.snapshot()
    }
}
