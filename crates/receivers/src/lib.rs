//! Satellite Receivers - agent-facing protocol endpoints
//!
//! Receivers terminate the agents' protocols and emit envelopes into the
//! pipeline:
//!
//! - `GrpcReceiver` - every RPC protocol family, driven by the static
//!   protocol descriptors (unary, client-stream, server-stream and
//!   bidirectional calls)
//! - `HttpLogReceiver` - SkyWalking logs as HTTP protobuf bodies
//!
//! Both register on a shared `Server`; one server of each kind runs per
//! process.
//!
//! # Example
//!
//! ```ignore
//! use satellite_config::{ReceiverConfig, ReceiverKind};
//! use satellite_receivers::{GrpcServer, Server, build_receiver};
//!
//! let mut server = Server::Grpc(GrpcServer::new("0.0.0.0:11800".parse()?));
//! let receiver = build_receiver(&ReceiverConfig::new("log", ReceiverKind::GrpcNativeLog));
//! receiver.register_handler(&mut server)?;
//! pipeline.attach(receiver.name(), receiver.channel().unwrap());
//! tokio::spawn(server.run(cancel.child_token()));
//! ```

mod error;
mod grpc;
mod http_log;
mod receiver;
mod server;

pub use error::{ReceiverError, Result};
pub use grpc::GrpcReceiver;
pub use http_log::HttpLogReceiver;
pub use receiver::{OUTPUT_CHANNEL_CAPACITY, Receiver, ReceiverMetricsHandle, build_receiver};
pub use server::{
    CallHandler, GrpcServer, HttpServer, Server, ServerCall, ServerMetrics, ServerMetricsHandle,
    StatusBody, status_response,
};
