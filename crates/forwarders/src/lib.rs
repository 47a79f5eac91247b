//! Satellite Forwarders - the upstream side of each event type
//!
//! - `GrpcForwarder` - sends batches and sync calls to the upstream
//!   collector over a shared HTTP/2 channel
//! - `NullForwarder` - acknowledges and discards
//!
//! `ForwarderPlugin` selects one of them from a `[[forwarders]]` entry.
//! gRPC forwarders need `prepare` with an `UpstreamClient` before their
//! first batch; an unprepared forwarder fails with `NotPrepared`.

mod error;
mod grpc;
mod null;
mod plugin;
mod upstream;

pub use error::{ForwarderError, Result};
pub use grpc::GrpcForwarder;
pub use null::NullForwarder;
pub use plugin::{ForwarderMetricsHandle, ForwarderPlugin};
pub use upstream::UpstreamClient;
