//! Event type registry
//!
//! `EventType` is the closed set of telemetry kinds the satellite carries.
//! Receivers and forwarders are paired by this tag: a receiver emitting
//! `Log` can only be served by a forwarder whose `forward_type()` is `Log`.

use std::str::FromStr;

use crate::ProtocolError;

/// Telemetry kind carried by an envelope
///
/// The numeric tags are stable and shared by every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventType {
    /// Trace segment
    Segment = 1,
    /// Log entry
    Log = 2,
    /// JVM metric collection
    Jvm = 3,
    /// CLR metric collection
    Clr = 4,
    /// Management instance properties report
    ManagementReport = 5,
    /// Management keep-alive ping
    ManagementPing = 6,
    /// Event
    Event = 7,
    /// Meter collection
    Meter = 8,
    /// Profile thread snapshot
    ProfileSnapshot = 9,
    /// Profile task query
    ProfileTaskQuery = 10,
    /// Profile task finish report
    ProfileTaskFinish = 11,
    /// eBPF profiling data list
    EbpfProfilingData = 12,
    /// eBPF profiling task query
    EbpfProfilingTaskQuery = 13,
    /// eBPF process ping list
    EbpfProcessPing = 14,
    /// eBPF process report
    EbpfProcessReport = 15,
    /// eBPF access-log batch
    EbpfAccessLog = 16,
    /// Agent configuration discovery request
    ConfigurationSync = 17,
    /// Continuous profiling policy query
    ContinuousProfilingPolicyQuery = 18,
    /// Continuous profiling report
    ContinuousProfilingReport = 19,
    /// Async-profiler task query
    AsyncProfilerTaskQuery = 20,
    /// Async-profiler upload metadata
    AsyncProfilerMetadata = 21,
    /// Async-profiler JFR chunk
    AsyncProfilerChunk = 22,
    /// Envoy access log service v2 list
    EnvoyAlsV2 = 23,
    /// Envoy access log service v3 list
    EnvoyAlsV3 = 24,
    /// Envoy metrics service v2 list
    EnvoyMetricsV2 = 25,
    /// Envoy metrics service v3 list
    EnvoyMetricsV3 = 26,
    /// OpenTelemetry metrics v1 export request
    OtlpMetrics = 27,
    /// Already-serialized frames
    Opaque = 28,
}

impl EventType {
    /// Every event type, in tag order
    pub const ALL: [EventType; 28] = [
        Self::Segment,
        Self::Log,
        Self::Jvm,
        Self::Clr,
        Self::ManagementReport,
        Self::ManagementPing,
        Self::Event,
        Self::Meter,
        Self::ProfileSnapshot,
        Self::ProfileTaskQuery,
        Self::ProfileTaskFinish,
        Self::EbpfProfilingData,
        Self::EbpfProfilingTaskQuery,
        Self::EbpfProcessPing,
        Self::EbpfProcessReport,
        Self::EbpfAccessLog,
        Self::ConfigurationSync,
        Self::ContinuousProfilingPolicyQuery,
        Self::ContinuousProfilingReport,
        Self::AsyncProfilerTaskQuery,
        Self::AsyncProfilerMetadata,
        Self::AsyncProfilerChunk,
        Self::EnvoyAlsV2,
        Self::EnvoyAlsV3,
        Self::EnvoyMetricsV2,
        Self::EnvoyMetricsV3,
        Self::OtlpMetrics,
        Self::Opaque,
    ];

    /// Parse from the wire tag
    pub const fn from_u8(value: u8) -> Option<Self> {
        if value == 0 || value as usize > Self::ALL.len() {
            return None;
        }
        Some(Self::ALL[value as usize - 1])
    }

    /// Wire tag
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Configuration and log name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Log => "log",
            Self::Jvm => "jvm",
            Self::Clr => "clr",
            Self::ManagementReport => "management_report",
            Self::ManagementPing => "management_ping",
            Self::Event => "event",
            Self::Meter => "meter",
            Self::ProfileSnapshot => "profile_snapshot",
            Self::ProfileTaskQuery => "profile_task_query",
            Self::ProfileTaskFinish => "profile_task_finish",
            Self::EbpfProfilingData => "ebpf_profiling_data",
            Self::EbpfProfilingTaskQuery => "ebpf_profiling_task_query",
            Self::EbpfProcessPing => "ebpf_process_ping",
            Self::EbpfProcessReport => "ebpf_process_report",
            Self::EbpfAccessLog => "ebpf_access_log",
            Self::ConfigurationSync => "configuration_sync",
            Self::ContinuousProfilingPolicyQuery => "continuous_profiling_policy_query",
            Self::ContinuousProfilingReport => "continuous_profiling_report",
            Self::AsyncProfilerTaskQuery => "async_profiler_task_query",
            Self::AsyncProfilerMetadata => "async_profiler_metadata",
            Self::AsyncProfilerChunk => "async_profiler_chunk",
            Self::EnvoyAlsV2 => "envoy_als_v2",
            Self::EnvoyAlsV3 => "envoy_als_v3",
            Self::EnvoyMetricsV2 => "envoy_metrics_v2",
            Self::EnvoyMetricsV3 => "envoy_metrics_v3",
            Self::OtlpMetrics => "otlp_metrics",
            Self::Opaque => "opaque",
        }
    }

    /// Whether the payload of this kind is a list of messages
    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::EbpfProfilingData
                | Self::EbpfAccessLog
                | Self::EnvoyAlsV2
                | Self::EnvoyAlsV3
                | Self::EnvoyMetricsV2
                | Self::EnvoyMetricsV3
                | Self::Opaque
        )
    }

    /// Whether the agent waits for the upstream response of this kind
    pub const fn is_sync(self) -> bool {
        matches!(
            self,
            Self::ProfileTaskQuery
                | Self::EbpfProfilingTaskQuery
                | Self::EbpfProcessReport
                | Self::ConfigurationSync
                | Self::ContinuousProfilingPolicyQuery
                | Self::AsyncProfilerTaskQuery
                | Self::AsyncProfilerMetadata
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownEventType(s.to_string()))
    }
}

impl TryFrom<u8> for EventType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ProtocolError::InvalidEventTypeTag(value))
    }
}
