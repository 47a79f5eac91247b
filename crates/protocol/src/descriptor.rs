//! Protocol descriptors
//!
//! Static description of every RPC method the satellite terminates: which
//! event type it produces, its streaming shape, how inbound frames become
//! envelopes, and which ACK the agent expects. Adapters are driven entirely
//! by these descriptors.

use bytes::Bytes;
use prost::Message;

use crate::EventType;
use crate::proto::Commands;

/// Streaming shape of an RPC method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamShape {
    /// One request, one response
    Unary,
    /// Many requests, one response
    ClientStream,
    /// One request, many responses
    ServerStream,
    /// Interleaved requests and responses
    Bidirectional,
}

/// How inbound frames are turned into envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// One envelope per frame
    PerFrame,
    /// Collect frames, emit one list envelope at EOF (or when full)
    Collect,
    /// Stream-scoped batching driven by a local limiter
    EdgeBatch,
}

/// Response an agent expects after a successful non-sync call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Empty `Commands` list
    Commands,
    /// Empty response message
    Empty,
}

impl Ack {
    /// Encoded ACK frame
    pub fn encode(self) -> Bytes {
        match self {
            Self::Commands => Bytes::from(Commands::default().encode_to_vec()),
            Self::Empty => Bytes::new(),
        }
    }
}

/// Static description of one terminated RPC method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    pub event_type: EventType,
    /// Fully qualified method path, `/package.Service/Method`
    pub method: &'static str,
    pub shape: StreamShape,
    pub emission: Emission,
    /// Response must come from the upstream via `SyncInvoker`
    pub sync: bool,
    /// Frames carry a first-frame-only identifier
    pub identifier: bool,
    pub ack: Ack,
}

impl ProtocolDescriptor {
    const fn unary(event_type: EventType, method: &'static str) -> Self {
        Self {
            event_type,
            method,
            shape: StreamShape::Unary,
            emission: Emission::PerFrame,
            sync: false,
            identifier: false,
            ack: Ack::Commands,
        }
    }

    const fn client_stream(event_type: EventType, method: &'static str) -> Self {
        Self {
            shape: StreamShape::ClientStream,
            ..Self::unary(event_type, method)
        }
    }

    const fn synchronous(self) -> Self {
        Self { sync: true, ..self }
    }

    const fn collect(self) -> Self {
        Self {
            emission: Emission::Collect,
            ..self
        }
    }

    const fn edge_batch(self) -> Self {
        Self {
            emission: Emission::EdgeBatch,
            ..self
        }
    }

    const fn identified(self) -> Self {
        Self {
            identifier: true,
            ..self
        }
    }

    const fn empty_ack(self) -> Self {
        Self {
            ack: Ack::Empty,
            ..self
        }
    }

    const fn bidirectional(self) -> Self {
        Self {
            shape: StreamShape::Bidirectional,
            ..self
        }
    }

    /// Look up the descriptor for an event type
    pub fn for_event_type(event_type: EventType) -> Option<&'static ProtocolDescriptor> {
        DESCRIPTORS.iter().find(|d| d.event_type == event_type)
    }

    /// Look up the descriptor for a method path
    pub fn for_method(method: &str) -> Option<&'static ProtocolDescriptor> {
        DESCRIPTORS.iter().find(|d| d.method == method)
    }

    /// Every terminated method
    pub fn all() -> &'static [ProtocolDescriptor] {
        DESCRIPTORS
    }
}

use crate::EventType as T;
use self::ProtocolDescriptor as D;

static DESCRIPTORS: &[ProtocolDescriptor] = &[
    D::client_stream(T::Segment, "/skywalking.v3.TraceSegmentReportService/collect"),
    D::client_stream(T::Log, "/skywalking.v3.LogReportService/collect"),
    D::unary(T::Jvm, "/skywalking.v3.JVMMetricReportService/collect"),
    D::unary(T::Clr, "/skywalking.v3.CLRMetricReportService/collect"),
    D::unary(
        T::ManagementReport,
        "/skywalking.v3.ManagementService/reportInstanceProperties",
    ),
    D::unary(T::ManagementPing, "/skywalking.v3.ManagementService/keepAlive"),
    D::client_stream(T::Event, "/skywalking.v3.EventService/collect"),
    D::client_stream(T::Meter, "/skywalking.v3.MeterReportService/collect"),
    D::client_stream(T::ProfileSnapshot, "/skywalking.v3.ProfileTask/collectSnapshot"),
    D::unary(
        T::ProfileTaskQuery,
        "/skywalking.v3.ProfileTask/getProfileTaskCommands",
    )
    .synchronous(),
    D::unary(T::ProfileTaskFinish, "/skywalking.v3.ProfileTask/reportTaskFinish"),
    D::client_stream(
        T::EbpfProfilingData,
        "/skywalking.v3.EBPFProfilingService/collectProfilingData",
    )
    .collect(),
    D::unary(
        T::EbpfProfilingTaskQuery,
        "/skywalking.v3.EBPFProfilingService/queryTasks",
    )
    .synchronous(),
    D::unary(T::EbpfProcessPing, "/skywalking.v3.EBPFProcessService/keepAlive"),
    D::unary(
        T::EbpfProcessReport,
        "/skywalking.v3.EBPFProcessService/reportProcesses",
    )
    .synchronous(),
    D::client_stream(T::EbpfAccessLog, "/skywalking.v3.EBPFAccessLogService/collect")
        .collect()
        .empty_ack(),
    D::unary(
        T::ConfigurationSync,
        "/skywalking.v3.ConfigurationDiscoveryService/fetchConfigurations",
    )
    .synchronous(),
    D::unary(
        T::ContinuousProfilingPolicyQuery,
        "/skywalking.v3.ContinuousProfilingService/queryPolicies",
    )
    .synchronous(),
    D::unary(
        T::ContinuousProfilingReport,
        "/skywalking.v3.ContinuousProfilingService/reportProfilingTask",
    ),
    D::unary(
        T::AsyncProfilerTaskQuery,
        "/skywalking.v10.AsyncProfilerTask/getAsyncProfilerTaskCommands",
    )
    .synchronous(),
    D::unary(T::AsyncProfilerMetadata, "/skywalking.v10.AsyncProfilerTask/collect")
        .bidirectional()
        .synchronous(),
    D::client_stream(
        T::EnvoyAlsV2,
        "/envoy.service.accesslog.v2.AccessLogService/StreamAccessLogs",
    )
    .identified()
    .empty_ack(),
    D::client_stream(
        T::EnvoyAlsV3,
        "/envoy.service.accesslog.v3.AccessLogService/StreamAccessLogs",
    )
    .identified()
    .empty_ack(),
    D::client_stream(
        T::EnvoyMetricsV2,
        "/envoy.service.metrics.v2.MetricsService/StreamMetrics",
    )
    .identified()
    .edge_batch()
    .empty_ack(),
    D::client_stream(
        T::EnvoyMetricsV3,
        "/envoy.service.metrics.v3.MetricsService/StreamMetrics",
    )
    .identified()
    .edge_batch()
    .empty_ack(),
    D::unary(
        T::OtlpMetrics,
        "/opentelemetry.proto.collector.metrics.v1.MetricsService/Export",
    )
    .empty_ack(),
];
