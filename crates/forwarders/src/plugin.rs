//! Forwarder selection from configuration

use std::sync::Arc;

use satellite_config::{ForwarderConfig, ForwarderKind};
use satellite_metrics::{ForwarderMetrics, ForwarderMetricsProvider, ForwarderMetricsSnapshot};
use satellite_pipeline::Forwarder;
use satellite_protocol::EventType;

use crate::Result;
use crate::grpc::GrpcForwarder;
use crate::null::NullForwarder;
use crate::upstream::UpstreamClient;

/// A configured forwarder, one variant per kind
#[derive(Clone)]
pub enum ForwarderPlugin {
    Grpc(Arc<GrpcForwarder>),
    Null(Arc<NullForwarder>),
}

impl ForwarderPlugin {
    pub fn from_config(config: &ForwarderConfig) -> Result<Self> {
        Ok(match config.kind {
            ForwarderKind::Grpc => Self::Grpc(Arc::new(GrpcForwarder::new(
                config.name.clone(),
                config.event_type,
            )?)),
            ForwarderKind::Null => Self::Null(Arc::new(NullForwarder::new(
                config.name.clone(),
                config.event_type,
            ))),
        })
    }

    pub fn kind(&self) -> ForwarderKind {
        match self {
            Self::Grpc(_) => ForwarderKind::Grpc,
            Self::Null(_) => ForwarderKind::Null,
        }
    }

    /// Attach the upstream client to RPC forwarders
    pub fn prepare(&self, client: &Arc<UpstreamClient>) {
        if let Self::Grpc(forwarder) = self {
            forwarder.prepare(Arc::clone(client));
        }
    }

    /// Trait object handed to the pipeline
    pub fn forwarder(&self) -> Arc<dyn Forwarder> {
        match self {
            Self::Grpc(forwarder) => Arc::clone(forwarder) as Arc<dyn Forwarder>,
            Self::Null(forwarder) => Arc::clone(forwarder) as Arc<dyn Forwarder>,
        }
    }

    pub fn name(&self) -> String {
        self.forwarder().name().to_string()
    }

    pub fn forward_type(&self) -> EventType {
        self.forwarder().forward_type()
    }

    pub fn metrics_handle(&self) -> ForwarderMetricsHandle {
        let metrics = match self {
            Self::Grpc(forwarder) => Arc::clone(forwarder.metrics()),
            Self::Null(forwarder) => Arc::clone(forwarder.metrics()),
        };
        ForwarderMetricsHandle {
            name: self.name(),
            event_type: self.forward_type(),
            metrics,
        }
    }
}

/// Handle for the metrics reporter
pub struct ForwarderMetricsHandle {
    name: String,
    event_type: EventType,
    metrics: Arc<ForwarderMetrics>,
}

impl ForwarderMetricsProvider for ForwarderMetricsHandle {
    fn forwarder_id(&self) -> &str {
        &self.name
    }

    fn forwarder_type(&self) -> &str {
        self.event_type.as_str()
    }

    fn snapshot(&self) -> ForwarderMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ForwarderError;

    #[test]
    fn test_from_config_picks_kind() {
        let grpc = ForwarderPlugin::from_config(&ForwarderConfig::new(
            "log",
            ForwarderKind::Grpc,
            EventType::Log,
        ))
        .unwrap();
        assert_eq!(grpc.kind(), ForwarderKind::Grpc);
        assert_eq!(grpc.forward_type(), EventType::Log);

        let null = ForwarderPlugin::from_config(&ForwarderConfig::new(
            "mute",
            ForwarderKind::Null,
            EventType::Meter,
        ))
        .unwrap();
        assert_eq!(null.kind(), ForwarderKind::Null);
        assert_eq!(null.name(), "mute");
    }

    #[test]
    fn test_grpc_without_method_is_rejected() {
        let result = ForwarderPlugin::from_config(&ForwarderConfig::new(
            "opaque",
            ForwarderKind::Grpc,
            EventType::Opaque,
        ));
        assert!(matches!(result, Err(ForwarderError::NoMethod { .. })));
    }

    #[test]
    fn test_prepare_reaches_grpc_forwarder() {
        let plugin = ForwarderPlugin::from_config(&ForwarderConfig::new(
            "segment",
            ForwarderKind::Grpc,
            EventType::Segment,
        ))
        .unwrap();
        plugin.prepare(&Arc::new(UpstreamClient::new("127.0.0.1:1").unwrap()));

        let ForwarderPlugin::Grpc(forwarder) = &plugin else { unreachable!() };
        assert!(forwarder.is_prepared());
    }

    #[test]
    fn test_metrics_handle_names() {
        let plugin = ForwarderPlugin::from_config(&ForwarderConfig::new(
            "jvm-out",
            ForwarderKind::Null,
            EventType::Jvm,
        ))
        .unwrap();
        let handle = plugin.metrics_handle();
        assert_eq!(handle.forwarder_id(), "jvm-out");
        assert_eq!(handle.forwarder_type(), "jvm");
        assert_eq!(handle.snapshot(), ForwarderMetricsSnapshot::default());
    }
}
