//! RPC receivers
//!
//! Every RPC receiver kind is the same machine: the kind names its event
//! types, each event type has a static `ProtocolDescriptor`, and one
//! `DescriptorHandler` per descriptor is mounted on the shared
//! `GrpcServer`.

mod adapter;
mod edge;
mod identifier;

use std::sync::Arc;

use crossfire::AsyncRx;
use satellite_config::{ReceiverConfig, ReceiverKind, ServerKind};
use satellite_pipeline::LimiterConfig;
use satellite_protocol::{Envelope, ProtocolDescriptor, SyncInvoker};
use tracing::debug;

use self::adapter::{DescriptorHandler, StreamSettings};
use crate::receiver::{Receiver, ReceiverContext, ReceiverMetricsHandle};
use crate::server::Server;
use crate::{ReceiverError, Result};

/// Receiver for one RPC protocol family
pub struct GrpcReceiver {
    ctx: Arc<ReceiverContext>,
    descriptors: Vec<&'static ProtocolDescriptor>,
    settings: StreamSettings,
}

impl GrpcReceiver {
    pub fn new(config: &ReceiverConfig) -> Self {
        let descriptors = config
            .kind
            .event_types()
            .iter()
            .filter_map(|t| ProtocolDescriptor::for_event_type(*t))
            .collect();
        Self {
            ctx: Arc::new(ReceiverContext::new(config.name.clone(), config.kind)),
            descriptors,
            settings: StreamSettings {
                edge_batch: LimiterConfig::new(config.batch_flush_period, config.batch_limit_count),
                max_list_items: config.max_list_items,
            },
        }
    }

    /// Methods this receiver terminates
    pub fn descriptors(&self) -> &[&'static ProtocolDescriptor] {
        &self.descriptors
    }
}

impl Receiver for GrpcReceiver {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn kind(&self) -> ReceiverKind {
        self.ctx.kind
    }

    fn register_handler(&self, server: &mut Server) -> Result<()> {
        let actual = server.kind();
        let Server::Grpc(rpc) = server else {
            return Err(ReceiverError::server_mismatch(
                self.name(),
                ServerKind::Grpc,
                actual,
            ));
        };
        for &descriptor in &self.descriptors {
            let handler = DescriptorHandler::new(descriptor, Arc::clone(&self.ctx), self.settings);
            rpc.register(descriptor.method, Arc::new(handler))?;
            debug!(receiver = self.name(), method = descriptor.method, "registered grpc method");
        }
        Ok(())
    }

    fn register_sync_invoker(&self, invoker: Arc<dyn SyncInvoker>) {
        self.ctx.set_invoker(invoker);
    }

    fn channel(&self) -> Option<AsyncRx<Envelope>> {
        self.ctx.take_channel()
    }

    fn metrics_handle(&self) -> ReceiverMetricsHandle {
        self.ctx.metrics_handle()
    }
}

#[cfg(test)]
#[path = "grpc_test.rs"]
mod tests;
