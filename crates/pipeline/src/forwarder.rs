//! Forwarder contract
//!
//! A forwarder carries exactly one `EventType` to the upstream. The
//! pipeline hands it whole batches drained from its lane; sync-capable
//! forwarders also answer `sync_forward` for the `SyncInvoker` bridge.
//!
//! Connection setup is not part of this trait: each implementation exposes
//! a typed `prepare` for its own transport, so pairing a forwarder with the
//! wrong kind of client does not compile.

use std::time::Duration;

use async_trait::async_trait;
use satellite_config::{FallbackStrategy, PipelineConfig};
use satellite_protocol::rpc::RpcError;
use satellite_protocol::{Envelope, EventType, InvokeError, SyncResponse};
use thiserror::Error;

/// Forwarding errors
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Upstream transport or status failure
    #[error("transport error: {0}")]
    Transport(#[from] RpcError),

    /// `forward` called before `prepare`
    #[error("forwarder '{0}' has no upstream connection")]
    NotPrepared(String),

    /// `sync_forward` on a forwarder that cannot answer
    #[error("forwarder for {0} does not support sync forward")]
    SyncUnsupported(EventType),

    /// Envelope of another type reached this forwarder
    #[error("forwarder for {expected} received a {actual} envelope")]
    WrongType {
        expected: EventType,
        actual: EventType,
    },

    /// Upstream answered with something unusable
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl ForwardError {
    pub fn wrong_type(expected: EventType, actual: EventType) -> Self {
        Self::WrongType { expected, actual }
    }

    /// Status-carrying form handed back through the `SyncInvoker`
    pub fn into_invoke_error(self) -> InvokeError {
        match self {
            Self::Transport(e) => InvokeError::Upstream(e),
            Self::NotPrepared(_) => InvokeError::Unavailable(self.to_string()),
            Self::SyncUnsupported(event_type) => InvokeError::Unsupported(event_type),
            Self::WrongType { .. } => InvokeError::Internal(self.to_string()),
            Self::InvalidResponse(message) => InvokeError::InvalidResponse(message),
        }
    }
}

/// Upstream side of one event type
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Configured name, used in logs and metrics
    fn name(&self) -> &str;

    /// The only event type this forwarder accepts
    fn forward_type(&self) -> EventType;

    fn supports_sync_invoke(&self) -> bool {
        false
    }

    /// Deliver one batch, in order
    async fn forward(&self, batch: &[Envelope]) -> Result<(), ForwardError>;

    /// One request, one upstream answer; no buffering
    async fn sync_forward(&self, envelope: Envelope) -> Result<SyncResponse, ForwardError> {
        drop(envelope);
        Err(ForwardError::SyncUnsupported(self.forward_type()))
    }
}

/// What a lane does with a batch its forwarder rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Log and discard
    #[default]
    Drop,
    /// Retry once after `backoff`, then discard
    RetryOnce { backoff: Duration },
}

impl FallbackPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        match config.fallback {
            FallbackStrategy::Drop => Self::Drop,
            FallbackStrategy::RetryOnce => Self::RetryOnce {
                backoff: config.retry_backoff,
            },
        }
    }
}
