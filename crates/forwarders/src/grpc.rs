//! gRPC forwarder
//!
//! Carries one event type to the upstream collector over the method its
//! `ProtocolDescriptor` names:
//!
//! - client-stream kinds: one upstream stream per batch, every frame of
//!   every envelope in order, then half-close and wait for the ACK
//! - unary kinds: one call per frame, best effort; failures are logged and
//!   the first one is reported after the rest were tried
//! - sync kinds: `sync_forward` relays the upstream's response frames, and
//!   for the bidirectional async-profiler upload hands back the open
//!   stream for the receiver to continue

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use satellite_metrics::ForwarderMetrics;
use satellite_pipeline::{ForwardError, Forwarder};
use satellite_protocol::rpc::{ClientCall, RpcError};
use satellite_protocol::{
    Bytes, Envelope, EventType, InvokeError, Payload, ProtocolDescriptor, ServerStreamHandle,
    StreamShape, SyncResponse,
};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::upstream::UpstreamClient;
use crate::{ForwarderError, Result};

/// Forwarder calling the upstream collector over gRPC
pub struct GrpcForwarder {
    name: String,
    descriptor: &'static ProtocolDescriptor,
    client: OnceLock<Arc<UpstreamClient>>,
    metrics: Arc<ForwarderMetrics>,
}

impl GrpcForwarder {
    pub fn new(name: impl Into<String>, event_type: EventType) -> Result<Self> {
        let name = name.into();
        let descriptor = ProtocolDescriptor::for_event_type(event_type)
            .ok_or_else(|| ForwarderError::no_method(name.clone(), event_type))?;
        Ok(Self {
            name,
            descriptor,
            client: OnceLock::new(),
            metrics: Arc::new(ForwarderMetrics::new()),
        })
    }

    /// Attach the upstream connection; later calls are ignored
    pub fn prepare(&self, client: Arc<UpstreamClient>) {
        if self.client.set(client).is_err() {
            debug!(forwarder = %self.name, "already prepared");
        }
    }

    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.client.get().is_some()
    }

    /// Upstream method this forwarder calls
    #[inline]
    pub fn method(&self) -> &'static str {
        self.descriptor.method
    }

    pub(crate) fn metrics(&self) -> &Arc<ForwarderMetrics> {
        &self.metrics
    }

    fn client(&self) -> std::result::Result<&UpstreamClient, ForwardError> {
        self.client
            .get()
            .map(Arc::as_ref)
            .ok_or_else(|| ForwardError::NotPrepared(self.name.clone()))
    }

    fn check_type(&self, envelope: &Envelope) -> std::result::Result<(), ForwardError> {
        if envelope.event_type() != self.descriptor.event_type {
            return Err(ForwardError::wrong_type(
                self.descriptor.event_type,
                envelope.event_type(),
            ));
        }
        Ok(())
    }

    /// Send every frame of the batch on one stream
    async fn forward_stream(
        &self,
        client: &UpstreamClient,
        batch: &[Envelope],
    ) -> std::result::Result<(), ForwardError> {
        client
            .bounded("upstream stream", async move {
                let mut call = client.open(self.method()).await?;
                send_all(&mut call, batch).await?;
                call.finish().await
            })
            .await?;
        Ok(())
    }

    /// One unary call per frame, first failure reported at the end
    async fn forward_unary(
        &self,
        client: &UpstreamClient,
        batch: &[Envelope],
    ) -> std::result::Result<(), ForwardError> {
        let mut first_error = None;
        for envelope in batch {
            for frame in envelope.payload().to_frames() {
                if let Err(e) = self.unary_call(client, frame).await {
                    self.metrics.record_error();
                    warn!(forwarder = %self.name, error = %e, "unary forward failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn unary_call(
        &self,
        client: &UpstreamClient,
        frame: Bytes,
    ) -> std::result::Result<Vec<Bytes>, RpcError> {
        client
            .bounded("upstream call", async move {
                let mut call = client.open(self.method()).await?;
                call.send_message(frame).await?;
                call.finish().await
            })
            .await
    }

    fn response(&self, frames: Vec<Bytes>) -> Envelope {
        Envelope::synthesized(self.name.clone(), Payload::Opaque(frames))
    }
}

async fn send_all(call: &mut ClientCall, batch: &[Envelope]) -> std::result::Result<(), RpcError> {
    for envelope in batch {
        for frame in envelope.payload().to_frames() {
            call.send_message(frame).await?;
        }
    }
    Ok(())
}

fn batch_bytes(batch: &[Envelope]) -> u64 {
    batch.iter().map(|e| e.payload().encoded_len() as u64).sum()
}

#[async_trait]
impl Forwarder for GrpcForwarder {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward_type(&self) -> EventType {
        self.descriptor.event_type
    }

    fn supports_sync_invoke(&self) -> bool {
        self.descriptor.sync
    }

    async fn forward(&self, batch: &[Envelope]) -> std::result::Result<(), ForwardError> {
        let client = self.client()?;
        for envelope in batch {
            self.check_type(envelope)?;
        }
        if batch.is_empty() {
            return Ok(());
        }

        let result = match self.descriptor.shape {
            StreamShape::ClientStream => self.forward_stream(client, batch).await,
            _ => self.forward_unary(client, batch).await,
        };

        match &result {
            Ok(()) => self.metrics.record_batch(batch.len() as u64, batch_bytes(batch)),
            Err(_) if self.descriptor.shape == StreamShape::ClientStream => {
                self.metrics.record_error()
            }
            Err(_) => {}
        }
        result
    }

    async fn sync_forward(
        &self,
        envelope: Envelope,
    ) -> std::result::Result<SyncResponse, ForwardError> {
        if !self.descriptor.sync {
            return Err(ForwardError::SyncUnsupported(self.descriptor.event_type));
        }
        self.check_type(&envelope)?;
        let client = self.client()?;

        let result = match self.descriptor.shape {
            StreamShape::Bidirectional => self.open_upload(client, &envelope).await,
            _ => self.request_response(client, &envelope).await,
        };
        self.metrics.record_sync(result.is_ok());
        result
    }
}

impl GrpcForwarder {
    async fn request_response(
        &self,
        client: &UpstreamClient,
        envelope: &Envelope,
    ) -> std::result::Result<SyncResponse, ForwardError> {
        let responses = client
            .bounded("upstream call", async move {
                let mut call = client.open(self.method()).await?;
                send_all(&mut call, std::slice::from_ref(envelope)).await?;
                call.finish().await
            })
            .await?;
        Ok(SyncResponse::unary(self.response(responses)))
    }

    /// Send the upload header, read the first answer, keep the stream open
    async fn open_upload(
        &self,
        client: &UpstreamClient,
        envelope: &Envelope,
    ) -> std::result::Result<SyncResponse, ForwardError> {
        let (call, first) = client
            .bounded("upstream upload", async move {
                let mut call = client.open(self.method()).await?;
                send_all(&mut call, std::slice::from_ref(envelope)).await?;
                let first = call.recv_message().await?;
                Ok((call, first))
            })
            .await?;

        let stream = UpstreamStream {
            forwarder: self.name.clone(),
            call,
            request_timeout: client.request_timeout(),
        };
        let response = self.response(first.into_iter().collect());
        Ok(SyncResponse::streaming(response, Box::new(stream)))
    }
}

/// Continuation of an upstream upload
struct UpstreamStream {
    forwarder: String,
    call: ClientCall,
    request_timeout: Duration,
}

#[async_trait]
impl ServerStreamHandle for UpstreamStream {
    async fn send_message(&mut self, message: Bytes) -> std::result::Result<(), InvokeError> {
        self.call.send_message(message).await?;
        Ok(())
    }

    /// Half-close and wait for the upstream to end the call
    ///
    /// The agent already has its answer; later upstream responses are
    /// counted and dropped.
    async fn close_send(&mut self) -> std::result::Result<(), InvokeError> {
        let call = &mut self.call;
        call.close_send();
        let discarded = timeout(self.request_timeout, async {
            let mut discarded = 0usize;
            while call.recv_message().await?.is_some() {
                discarded += 1;
            }
            Ok::<_, RpcError>(discarded)
        })
        .await
        .map_err(|_| RpcError::timeout("upstream upload"))??;

        if discarded > 0 {
            debug!(
                forwarder = %self.forwarder,
                method = self.call.method(),
                discarded,
                "upstream responses after upload"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "grpc_test.rs"]
mod tests;
