//! gRPC transport
//!
//! Agents and the upstream collector speak plain gRPC over HTTP/2. No
//! generated stubs are involved: every terminated method is described by a
//! `ProtocolDescriptor`, and messages travel as their original protobuf
//! bytes through `RawCodec`. Receivers answer calls with
//! `tonic::server::Grpc`; forwarders open them with `ClientCall` on a
//! shared `Channel`.

mod call;
mod codec;

pub use call::ClientCall;
pub use codec::{MAX_MESSAGE_SIZE, RawCodec, RawDecoder, RawEncoder};
pub use tonic::transport::{Channel, Endpoint};
pub use tonic::{Code, Status, Streaming};

use thiserror::Error;

/// Client-side call errors
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection could not be established or was lost
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Method is not a valid `/package.Service/Method` path
    #[error("invalid method path: {0}")]
    InvalidMethod(String),

    /// Peer ended the call with a non-OK status
    #[error("remote status {:?}: {}", .0.code(), .0.message())]
    Status(Status),

    /// Call ended without a response or status
    #[error("call closed")]
    Closed,

    /// Message sent after half-close
    #[error("send side already closed")]
    SendClosed,

    /// Operation did not complete in time
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },
}

impl RpcError {
    /// Create a timeout error
    #[inline]
    pub fn timeout(operation: &'static str) -> Self {
        Self::Timeout { operation }
    }

    /// Status to report to an agent when this error ends its call
    pub fn to_status(&self) -> Status {
        match self {
            Self::Status(status) => status.clone(),
            Self::Timeout { .. } => Status::deadline_exceeded(self.to_string()),
            Self::Transport(_) | Self::Closed => Status::unavailable(self.to_string()),
            Self::InvalidMethod(_) | Self::SendClosed => Status::internal(self.to_string()),
        }
    }
}

impl From<Status> for RpcError {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

/// Endpoint for a `HOST:PORT` address; a URI with a scheme is used as is
pub fn endpoint(address: &str) -> Result<Endpoint, RpcError> {
    let uri = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    Ok(Endpoint::from_shared(uri)?)
}

#[cfg(test)]
#[path = "rpc_test.rs"]
mod tests;
