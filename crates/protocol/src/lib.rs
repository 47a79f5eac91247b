//! Satellite Protocol - core types shared by receivers and forwarders
//!
//! This crate provides the foundational types that flow through the
//! satellite:
//! - `EventType` - closed registry of telemetry kinds
//! - `Payload` - per-kind payload, raw frames or decoded messages
//! - `Envelope` / `OutputEventContext` - the uniform event record
//! - `ProtocolDescriptor` - method path, stream shape and emission rules
//! - `rpc` - gRPC pass-through codec and the upstream call type
//! - `SyncInvoker` - request/response bridge from receivers to forwarders
//!
//! # Design Principles
//!
//! - **Opaque by default**: payloads stay as the agent's original bytes
//!   unless the satellite must read a field
//! - **Zero-copy**: `bytes::Bytes` is shared from the agent's message to the
//!   upstream write
//! - **Closed sets**: every kind and method is an enum variant or a static
//!   descriptor, never a runtime registration

mod descriptor;
mod envelope;
mod error;
mod event;
mod invoke;
mod payload;
pub mod proto;
pub mod rpc;

pub use descriptor::{Ack, Emission, ProtocolDescriptor, StreamShape};
pub use envelope::{Envelope, METADATA_RECEIVER, OutputEventContext, now_ms};
pub use error::ProtocolError;
pub use event::EventType;
pub use invoke::{InvokeError, ServerStreamHandle, SyncInvoker, SyncResponse};
pub use payload::Payload;

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod event_test;
#[cfg(test)]
mod payload_test;
