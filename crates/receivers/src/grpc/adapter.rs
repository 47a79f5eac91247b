//! Descriptor-driven call adapters
//!
//! One handler per terminated method. The descriptor decides the path:
//!
//! - unary: one request, emit it, answer with the ACK
//! - client stream: emit per frame, collect into one list envelope, or
//!   batch at the edge; ACK once the agent half-closes
//! - sync (unary and server stream): hand the request to the
//!   `SyncInvoker` and relay every response frame
//! - bidirectional: the first frame goes through the invoker, the rest are
//!   shovelled into the upstream stream that came back with the response

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use prost::Message;
use satellite_pipeline::LimiterConfig;
use satellite_protocol::proto::StreamMetricsMessage;
use satellite_protocol::rpc::Status;
use satellite_protocol::{
    Emission, InvokeError, Payload, ProtocolDescriptor, StreamShape, SyncResponse,
};
use tracing::{debug, warn};

use super::edge::EdgeBatcher;
use super::identifier::IdentifierCache;
use crate::receiver::{ChannelClosed, ReceiverContext};
use crate::server::{CallHandler, ServerCall};

type CallResult = Result<(), Status>;

impl From<ChannelClosed> for Status {
    fn from(_: ChannelClosed) -> Self {
        Status::unavailable("pipeline is shutting down")
    }
}

/// Per-stream limits taken from the receiver configuration
#[derive(Debug, Clone, Copy)]
pub(crate) struct StreamSettings {
    pub edge_batch: LimiterConfig,
    pub max_list_items: usize,
}

pub(crate) struct DescriptorHandler {
    descriptor: &'static ProtocolDescriptor,
    ctx: Arc<ReceiverContext>,
    settings: StreamSettings,
}

impl DescriptorHandler {
    pub fn new(
        descriptor: &'static ProtocolDescriptor,
        ctx: Arc<ReceiverContext>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            descriptor,
            ctx,
            settings,
        }
    }

    async fn next_frame(&self, call: &mut ServerCall) -> Result<Option<Bytes>, Status> {
        let frame = call.recv_message().await?;
        if let Some(frame) = &frame {
            self.ctx.metrics.frame_received(frame.len() as u64);
        }
        Ok(frame)
    }

    /// The one request message of a unary-request call
    async fn single_request(&self, call: &mut ServerCall) -> Result<Bytes, Status> {
        let Some(frame) = self.next_frame(call).await? else {
            return Err(Status::invalid_argument("missing request message"));
        };
        if self.next_frame(call).await?.is_some() {
            return Err(Status::invalid_argument(
                "expected a single request message",
            ));
        }
        Ok(frame)
    }

    fn decode(&self, frame: Bytes) -> Result<Payload, Status> {
        Payload::from_frame(self.descriptor.event_type, frame).map_err(|e| self.decode_failed(e))
    }

    fn decode_failed(&self, error: impl std::fmt::Display) -> Status {
        self.ctx.metrics.decode_error();
        debug!(receiver = %self.ctx.name, method = self.descriptor.method, error = %error, "failed to decode frame");
        Status::invalid_argument(error.to_string())
    }

    async fn ack(&self, call: &mut ServerCall) -> CallResult {
        call.send_message(self.descriptor.ack.encode()).await
    }

    async fn invoke(&self, payload: Payload) -> Result<SyncResponse, Status> {
        self.ctx.sync_invoke(payload).await.map_err(|e: InvokeError| {
            warn!(
                receiver = %self.ctx.name,
                method = self.descriptor.method,
                error = %e,
                "sync invoke failed"
            );
            e.to_status()
        })
    }

    async fn relay(&self, call: &mut ServerCall, response: &Payload) -> CallResult {
        for frame in response.to_frames() {
            call.send_message(frame).await?;
        }
        Ok(())
    }

    async fn unary(&self, call: &mut ServerCall) -> CallResult {
        let frame = self.single_request(call).await?;
        let payload = self.decode(frame)?;
        self.ctx.emit(payload).await?;
        self.ack(call).await
    }

    async fn request_response(&self, call: &mut ServerCall) -> CallResult {
        let frame = self.single_request(call).await?;
        let payload = self.decode(frame)?;
        let response = self.invoke(payload).await?;
        self.relay(call, response.envelope.payload()).await?;
        if let Some(mut stream) = response.stream {
            stream.close_send().await.map_err(|e| e.to_status())?;
        }
        Ok(())
    }

    async fn per_frame(&self, call: &mut ServerCall) -> CallResult {
        let mut identifiers = IdentifierCache::new();
        while let Some(frame) = self.next_frame(call).await? {
            let mut payload = self.decode(frame)?;
            if self.descriptor.identifier {
                identifiers.stamp_payload(&mut payload);
            }
            self.ctx.emit(payload).await?;
        }
        self.ack(call).await
    }

    async fn collect(&self, call: &mut ServerCall) -> CallResult {
        let limit = self.settings.max_list_items.max(1);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame(call).await? {
            frames.push(frame);
            if frames.len() >= limit {
                self.emit_list(std::mem::take(&mut frames)).await?;
            }
        }
        if !frames.is_empty() {
            self.emit_list(frames).await?;
        }
        self.ack(call).await
    }

    async fn emit_list(&self, frames: Vec<Bytes>) -> CallResult {
        let payload = Payload::from_frames(self.descriptor.event_type, frames)
            .map_err(|e| self.decode_failed(e))?;
        self.ctx.emit(payload).await?;
        Ok(())
    }

    /// The final flush runs before the call ends, even on shutdown
    async fn edge_batch(&self, call: &mut ServerCall) -> CallResult {
        let shutdown = call.shutdown_token().clone();
        let batcher = EdgeBatcher::start(
            Arc::clone(&self.ctx),
            self.descriptor.event_type,
            self.settings.edge_batch,
            &shutdown,
        )?;
        let result = self.fill_edge_batch(call, &batcher).await;
        batcher.finish().await;
        result?;
        self.ack(call).await
    }

    async fn fill_edge_batch(&self, call: &mut ServerCall, batcher: &EdgeBatcher) -> CallResult {
        let mut identifiers = IdentifierCache::new();
        while let Some(frame) = self.next_frame(call).await? {
            let mut message =
                StreamMetricsMessage::decode(frame).map_err(|e| self.decode_failed(e))?;
            identifiers.stamp(&mut message);
            batcher.push(message).await?;
        }
        Ok(())
    }

    async fn bidirectional(&self, call: &mut ServerCall) -> CallResult {
        let Some(first) = self.next_frame(call).await? else {
            return Err(Status::invalid_argument("missing first message"));
        };
        let payload = self.decode(first)?;
        let response = self.invoke(payload).await?;
        self.relay(call, response.envelope.payload()).await?;

        let Some(mut stream) = response.stream else {
            return Err(Status::internal("upstream did not open a stream"));
        };
        while let Some(frame) = self.next_frame(call).await? {
            stream
                .send_message(frame)
                .await
                .map_err(|e| e.to_status())?;
        }
        stream.close_send().await.map_err(|e| e.to_status())
    }
}

#[async_trait]
impl CallHandler for DescriptorHandler {
    async fn handle(&self, call: &mut ServerCall) -> CallResult {
        self.ctx.metrics.stream_opened();
        let descriptor = self.descriptor;
        let result = match (descriptor.shape, descriptor.sync, descriptor.emission) {
            (StreamShape::Bidirectional, _, _) => self.bidirectional(call).await,
            (_, true, _) => self.request_response(call).await,
            (StreamShape::ClientStream, false, Emission::PerFrame) => self.per_frame(call).await,
            (StreamShape::ClientStream, false, Emission::Collect) => self.collect(call).await,
            (StreamShape::ClientStream, false, Emission::EdgeBatch) => {
                self.edge_batch(call).await
            }
            (StreamShape::Unary | StreamShape::ServerStream, false, _) => self.unary(call).await,
        };
        self.ctx.metrics.stream_closed();
        result
    }
}
