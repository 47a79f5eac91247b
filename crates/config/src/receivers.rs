//! Receiver declarations
//!
//! ```toml
//! [[receivers]]
//! name = "envoy-metrics"
//! kind = "grpc_envoy_metrics_v3"
//! batch_limit_count = 200
//! batch_flush_period = "2s"
//! ```

use std::time::Duration;

use satellite_protocol::EventType;
use serde::Deserialize;

use crate::ServerKind;

/// Closed set of receiver implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverKind {
    GrpcNativeTracing,
    GrpcNativeLog,
    GrpcNativeJvm,
    GrpcNativeClr,
    GrpcNativeManagement,
    GrpcNativeEvent,
    GrpcNativeMeter,
    GrpcNativeProfile,
    GrpcNativeEbpfProfiling,
    GrpcNativeProcess,
    GrpcNativeEbpfAccessLog,
    GrpcNativeCds,
    GrpcNativeContinuousProfiling,
    GrpcNativeAsyncProfiler,
    GrpcEnvoyAlsV2,
    GrpcEnvoyAlsV3,
    GrpcEnvoyMetricsV2,
    GrpcEnvoyMetricsV3,
    GrpcOtlpMetricsV1,
    HttpNativeLog,
}

impl ReceiverKind {
    pub const ALL: &'static [ReceiverKind] = &[
        Self::GrpcNativeTracing,
        Self::GrpcNativeLog,
        Self::GrpcNativeJvm,
        Self::GrpcNativeClr,
        Self::GrpcNativeManagement,
        Self::GrpcNativeEvent,
        Self::GrpcNativeMeter,
        Self::GrpcNativeProfile,
        Self::GrpcNativeEbpfProfiling,
        Self::GrpcNativeProcess,
        Self::GrpcNativeEbpfAccessLog,
        Self::GrpcNativeCds,
        Self::GrpcNativeContinuousProfiling,
        Self::GrpcNativeAsyncProfiler,
        Self::GrpcEnvoyAlsV2,
        Self::GrpcEnvoyAlsV3,
        Self::GrpcEnvoyMetricsV2,
        Self::GrpcEnvoyMetricsV3,
        Self::GrpcOtlpMetricsV1,
        Self::HttpNativeLog,
    ];

    /// Configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrpcNativeTracing => "grpc_native_tracing",
            Self::GrpcNativeLog => "grpc_native_log",
            Self::GrpcNativeJvm => "grpc_native_jvm",
            Self::GrpcNativeClr => "grpc_native_clr",
            Self::GrpcNativeManagement => "grpc_native_management",
            Self::GrpcNativeEvent => "grpc_native_event",
            Self::GrpcNativeMeter => "grpc_native_meter",
            Self::GrpcNativeProfile => "grpc_native_profile",
            Self::GrpcNativeEbpfProfiling => "grpc_native_ebpf_profiling",
            Self::GrpcNativeProcess => "grpc_native_process",
            Self::GrpcNativeEbpfAccessLog => "grpc_native_ebpf_access_log",
            Self::GrpcNativeCds => "grpc_native_cds",
            Self::GrpcNativeContinuousProfiling => "grpc_native_continuous_profiling",
            Self::GrpcNativeAsyncProfiler => "grpc_native_async_profiler",
            Self::GrpcEnvoyAlsV2 => "grpc_envoy_als_v2",
            Self::GrpcEnvoyAlsV3 => "grpc_envoy_als_v3",
            Self::GrpcEnvoyMetricsV2 => "grpc_envoy_metrics_v2",
            Self::GrpcEnvoyMetricsV3 => "grpc_envoy_metrics_v3",
            Self::GrpcOtlpMetricsV1 => "grpc_otlp_metrics_v1",
            Self::HttpNativeLog => "http_native_log",
        }
    }

    /// Display name for listings
    pub fn show_name(&self) -> &'static str {
        match self {
            Self::GrpcNativeTracing => "GRPC Native Tracing Receiver",
            Self::GrpcNativeLog => "GRPC Native Log Receiver",
            Self::GrpcNativeJvm => "GRPC Native JVM Receiver",
            Self::GrpcNativeClr => "GRPC Native CLR Receiver",
            Self::GrpcNativeManagement => "GRPC Native Management Receiver",
            Self::GrpcNativeEvent => "GRPC Native Event Receiver",
            Self::GrpcNativeMeter => "GRPC Native Meter Receiver",
            Self::GrpcNativeProfile => "GRPC Native Profile Receiver",
            Self::GrpcNativeEbpfProfiling => "GRPC Native eBPF Profiling Receiver",
            Self::GrpcNativeProcess => "GRPC Native Process Receiver",
            Self::GrpcNativeEbpfAccessLog => "GRPC Native eBPF Access Log Receiver",
            Self::GrpcNativeCds => "GRPC Native Configuration Discovery Receiver",
            Self::GrpcNativeContinuousProfiling => "GRPC Native Continuous Profiling Receiver",
            Self::GrpcNativeAsyncProfiler => "GRPC Native Async Profiler Receiver",
            Self::GrpcEnvoyAlsV2 => "GRPC Envoy ALS v2 Receiver",
            Self::GrpcEnvoyAlsV3 => "GRPC Envoy ALS v3 Receiver",
            Self::GrpcEnvoyMetricsV2 => "GRPC Envoy Metrics v2 Receiver",
            Self::GrpcEnvoyMetricsV3 => "GRPC Envoy Metrics v3 Receiver",
            Self::GrpcOtlpMetricsV1 => "GRPC OpenTelemetry Metrics v1 Receiver",
            Self::HttpNativeLog => "HTTP Native Log Receiver",
        }
    }

    /// One-line description for listings
    pub fn description(&self) -> &'static str {
        match self {
            Self::GrpcNativeTracing => "Receives SkyWalking trace segments over client streams",
            Self::GrpcNativeLog => "Receives SkyWalking log data over client streams",
            Self::GrpcNativeJvm => "Receives JVM metric collections",
            Self::GrpcNativeClr => "Receives CLR metric collections",
            Self::GrpcNativeManagement => "Receives instance property reports and keep-alive pings",
            Self::GrpcNativeEvent => "Receives SkyWalking events",
            Self::GrpcNativeMeter => "Receives meter collections",
            Self::GrpcNativeProfile => {
                "Receives thread snapshots and relays profile task queries upstream"
            }
            Self::GrpcNativeEbpfProfiling => {
                "Receives eBPF profiling data and relays task queries upstream"
            }
            Self::GrpcNativeProcess => "Receives eBPF process pings and process reports",
            Self::GrpcNativeEbpfAccessLog => "Receives eBPF access-log batches as raw frames",
            Self::GrpcNativeCds => "Relays agent configuration discovery to the upstream",
            Self::GrpcNativeContinuousProfiling => {
                "Relays continuous profiling policies and receives trigger reports"
            }
            Self::GrpcNativeAsyncProfiler => {
                "Relays async-profiler task queries and JFR uploads to the upstream"
            }
            Self::GrpcEnvoyAlsV2 => "Receives Envoy v2 access logs with identifier propagation",
            Self::GrpcEnvoyAlsV3 => "Receives Envoy v3 access logs with identifier propagation",
            Self::GrpcEnvoyMetricsV2 => "Receives Envoy v2 metrics with stream-scoped batching",
            Self::GrpcEnvoyMetricsV3 => "Receives Envoy v3 metrics with stream-scoped batching",
            Self::GrpcOtlpMetricsV1 => "Receives OpenTelemetry metrics export requests",
            Self::HttpNativeLog => "Receives SkyWalking log data as HTTP protobuf bodies",
        }
    }

    /// Server the receiver registers its handlers with
    pub fn server(&self) -> ServerKind {
        match self {
            Self::HttpNativeLog => ServerKind::Http,
            _ => ServerKind::Grpc,
        }
    }

    /// Event types this receiver produces, sync kinds included
    pub fn event_types(&self) -> &'static [EventType] {
        use EventType as T;
        match self {
            Self::GrpcNativeTracing => &[T::Segment],
            Self::GrpcNativeLog | Self::HttpNativeLog => &[T::Log],
            Self::GrpcNativeJvm => &[T::Jvm],
            Self::GrpcNativeClr => &[T::Clr],
            Self::GrpcNativeManagement => &[T::ManagementReport, T::ManagementPing],
            Self::GrpcNativeEvent => &[T::Event],
            Self::GrpcNativeMeter => &[T::Meter],
            Self::GrpcNativeProfile => {
                &[T::ProfileSnapshot, T::ProfileTaskQuery, T::ProfileTaskFinish]
            }
            Self::GrpcNativeEbpfProfiling => &[T::EbpfProfilingData, T::EbpfProfilingTaskQuery],
            Self::GrpcNativeProcess => &[T::EbpfProcessPing, T::EbpfProcessReport],
            Self::GrpcNativeEbpfAccessLog => &[T::EbpfAccessLog],
            Self::GrpcNativeCds => &[T::ConfigurationSync],
            Self::GrpcNativeContinuousProfiling => {
                &[T::ContinuousProfilingPolicyQuery, T::ContinuousProfilingReport]
            }
            Self::GrpcNativeAsyncProfiler => &[T::AsyncProfilerTaskQuery, T::AsyncProfilerMetadata],
            Self::GrpcEnvoyAlsV2 => &[T::EnvoyAlsV2],
            Self::GrpcEnvoyAlsV3 => &[T::EnvoyAlsV3],
            Self::GrpcEnvoyMetricsV2 => &[T::EnvoyMetricsV2],
            Self::GrpcEnvoyMetricsV3 => &[T::EnvoyMetricsV3],
            Self::GrpcOtlpMetricsV1 => &[T::OtlpMetrics],
        }
    }

    /// Whether any produced type is answered by the upstream in real time
    pub fn needs_sync_invoker(&self) -> bool {
        self.event_types().iter().any(|t| t.is_sync())
    }

    /// Whether the receiver batches at the edge and reads the batch settings
    pub fn edge_batches(&self) -> bool {
        matches!(self, Self::GrpcEnvoyMetricsV2 | Self::GrpcEnvoyMetricsV3)
    }

    /// Commented TOML snippet declaring this receiver with default settings
    pub fn default_config(&self) -> String {
        let mut snippet = format!(
            "[[receivers]]\nname = \"{}\"\nkind = \"{}\"\n",
            self.as_str().replace('_', "-"),
            self.as_str()
        );
        let defaults = ReceiverConfig::new("", *self);
        if self.edge_batches() {
            snippet.push_str(&format!(
                "# flush the stream batch at this many items\nbatch_limit_count = {}\n\
                 # or after this long\nbatch_flush_period = \"{}\"\n",
                defaults.batch_limit_count,
                humantime_serde::re::humantime::format_duration(defaults.batch_flush_period)
            ));
        }
        if matches!(self, Self::GrpcNativeEbpfProfiling | Self::GrpcNativeEbpfAccessLog) {
            snippet.push_str(&format!(
                "# largest list collected from one stream\nmax_list_items = {}\n",
                defaults.max_list_items
            ));
        }
        snippet
    }
}

impl std::fmt::Display for ReceiverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `[[receivers]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    /// Unique name, stamped on every envelope as `receiver` metadata
    pub name: String,

    pub kind: ReceiverKind,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Edge batching size trigger (Envoy metrics)
    #[serde(default = "default_batch_limit_count")]
    pub batch_limit_count: usize,

    /// Edge batching time trigger (Envoy metrics)
    #[serde(default = "default_batch_flush_period", with = "humantime_serde")]
    pub batch_flush_period: Duration,

    /// Bound on frames collected into one list envelope
    #[serde(default = "default_max_list_items")]
    pub max_list_items: usize,
}

impl ReceiverConfig {
    pub fn new(name: impl Into<String>, kind: ReceiverKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: default_enabled(),
            batch_limit_count: default_batch_limit_count(),
            batch_flush_period: default_batch_flush_period(),
            max_list_items: default_max_list_items(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_batch_limit_count() -> usize {
    100
}

fn default_batch_flush_period() -> Duration {
    Duration::from_secs(1)
}

fn default_max_list_items() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        receivers: Vec<ReceiverConfig>,
    }

    #[test]
    fn test_every_kind_has_types() {
        for kind in ReceiverKind::ALL {
            assert!(!kind.event_types().is_empty(), "{kind}");
        }
    }

    #[test]
    fn test_sync_receivers() {
        assert!(ReceiverKind::GrpcNativeCds.needs_sync_invoker());
        assert!(ReceiverKind::GrpcNativeAsyncProfiler.needs_sync_invoker());
        assert!(ReceiverKind::GrpcNativeProcess.needs_sync_invoker());
        assert!(!ReceiverKind::GrpcNativeTracing.needs_sync_invoker());
        assert!(!ReceiverKind::GrpcEnvoyAlsV3.needs_sync_invoker());
    }

    #[test]
    fn test_http_log_shares_log_type() {
        assert_eq!(ReceiverKind::HttpNativeLog.server(), ServerKind::Http);
        assert_eq!(
            ReceiverKind::HttpNativeLog.event_types(),
            ReceiverKind::GrpcNativeLog.event_types()
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[[receivers]]
name = "als"
kind = "grpc_envoy_als_v2"
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        let receiver = &wrapper.receivers[0];
        assert_eq!(receiver.kind, ReceiverKind::GrpcEnvoyAlsV2);
        assert!(receiver.enabled);
        assert_eq!(receiver.batch_limit_count, 100);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let toml = "[[receivers]]\nname = \"x\"\nkind = \"grpc_carrier_pigeon\"\n";
        assert!(toml::from_str::<Wrapper>(toml).is_err());
    }

    #[test]
    fn test_default_config_parses_back() {
        for kind in ReceiverKind::ALL {
            let wrapper: Wrapper = toml::from_str(&kind.default_config()).unwrap();
            assert_eq!(wrapper.receivers[0].kind, *kind);
        }
        assert!(
            ReceiverKind::GrpcEnvoyMetricsV3
                .default_config()
                .contains("batch_flush_period = \"1s\"")
        );
    }
}
