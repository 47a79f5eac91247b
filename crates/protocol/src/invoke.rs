//! Synchronous invoke contract
//!
//! Some agent calls need the upstream collector's answer in real time
//! (configuration discovery, task queries, async-profiler uploads). The
//! receiver holds the agent's call open, hands the request envelope to a
//! `SyncInvoker`, and relays whatever comes back. The invoker never
//! buffers: one call is one upstream request.
//!
//! When the upstream exchange continues after the first response (the
//! JFR upload half of async-profiler), the response carries a
//! `ServerStreamHandle` the receiver shovels the remaining agent frames
//! into.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::rpc::{RpcError, Status};
use crate::{Envelope, EventType};

/// Continuation of an upstream exchange after the first response
#[async_trait]
pub trait ServerStreamHandle: Send {
    /// Send one more message upstream
    async fn send_message(&mut self, message: Bytes) -> Result<(), InvokeError>;

    /// Half-close and wait for the upstream to acknowledge
    async fn close_send(&mut self) -> Result<(), InvokeError>;
}

/// Result of a synchronous invoke
pub struct SyncResponse {
    /// Upstream response, usually an `Opaque` payload of response frames
    pub envelope: Envelope,
    /// Present when the exchange continues as a stream
    pub stream: Option<Box<dyn ServerStreamHandle>>,
}

impl SyncResponse {
    /// Response without a continuation stream
    pub fn unary(envelope: Envelope) -> Self {
        Self {
            envelope,
            stream: None,
        }
    }

    /// Response with a continuation stream
    pub fn streaming(envelope: Envelope, stream: Box<dyn ServerStreamHandle>) -> Self {
        Self {
            envelope,
            stream: Some(stream),
        }
    }
}

impl std::fmt::Debug for SyncResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncResponse")
            .field("envelope", &self.envelope)
            .field("stream", &self.stream.is_some())
            .finish()
    }
}

/// Narrow request/response bridge handed to receivers
#[async_trait]
pub trait SyncInvoker: Send + Sync {
    async fn sync_invoke(&self, envelope: Envelope) -> Result<SyncResponse, InvokeError>;
}

/// Sync invoke failures
#[derive(Debug, Error)]
pub enum InvokeError {
    /// No forwarder registered for the event type
    #[error("no forwarder for {0}")]
    NoForwarder(EventType),

    /// Forwarder exists but cannot answer synchronously
    #[error("forwarder for {0} does not support sync invoke")]
    Unsupported(EventType),

    /// No invoker was registered with the receiver
    #[error("sync invoker not registered")]
    NotRegistered,

    /// Upstream transport failure
    #[error("upstream error: {0}")]
    Upstream(#[from] RpcError),

    /// Upstream answered with a malformed response
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Forwarder cannot reach the upstream right now
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Local failure unrelated to the upstream
    #[error("internal error: {0}")]
    Internal(String),
}

impl InvokeError {
    /// Status reported to the agent
    pub fn to_status(&self) -> Status {
        match self {
            Self::NoForwarder(_) | Self::Unsupported(_) | Self::NotRegistered => {
                Status::unimplemented(self.to_string())
            }
            Self::Upstream(e) => e.to_status(),
            Self::Unavailable(_) => Status::unavailable(self.to_string()),
            Self::InvalidResponse(_) | Self::Internal(_) => Status::internal(self.to_string()),
        }
    }
}
