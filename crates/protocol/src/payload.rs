//! Envelope payloads
//!
//! One variant per `EventType`. Most kinds keep the agent's serialized
//! frame as-is so the forwarder can re-emit it without a decode/encode
//! round trip. The kinds the satellite has to look into (configuration
//! discovery and the identifier-bearing Envoy streams) are decoded once at
//! ingest and stay structured afterwards.

use bytes::Bytes;
use prost::Message;

use crate::proto::{ConfigurationSyncRequest, StreamAccessLogsMessage, StreamMetricsMessage};
use crate::{EventType, ProtocolError};

/// Tagged payload, variant matches the envelope's `EventType` 1:1
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Segment(Bytes),
    Log(Bytes),
    Jvm(Bytes),
    Clr(Bytes),
    ManagementReport(Bytes),
    ManagementPing(Bytes),
    Event(Bytes),
    Meter(Bytes),
    ProfileSnapshot(Bytes),
    ProfileTaskQuery(Bytes),
    ProfileTaskFinish(Bytes),
    EbpfProfilingData(Vec<Bytes>),
    EbpfProfilingTaskQuery(Bytes),
    EbpfProcessPing(Bytes),
    EbpfProcessReport(Bytes),
    EbpfAccessLog(Vec<Bytes>),
    ConfigurationSync(ConfigurationSyncRequest),
    ContinuousProfilingPolicyQuery(Bytes),
    ContinuousProfilingReport(Bytes),
    AsyncProfilerTaskQuery(Bytes),
    AsyncProfilerMetadata(Bytes),
    AsyncProfilerChunk(Bytes),
    EnvoyAlsV2(Vec<StreamAccessLogsMessage>),
    EnvoyAlsV3(Vec<StreamAccessLogsMessage>),
    EnvoyMetricsV2(Vec<StreamMetricsMessage>),
    EnvoyMetricsV3(Vec<StreamMetricsMessage>),
    OtlpMetrics(Bytes),
    Opaque(Vec<Bytes>),
}

impl Payload {
    /// The event type this payload belongs to
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Segment(_) => EventType::Segment,
            Self::Log(_) => EventType::Log,
            Self::Jvm(_) => EventType::Jvm,
            Self::Clr(_) => EventType::Clr,
            Self::ManagementReport(_) => EventType::ManagementReport,
            Self::ManagementPing(_) => EventType::ManagementPing,
            Self::Event(_) => EventType::Event,
            Self::Meter(_) => EventType::Meter,
            Self::ProfileSnapshot(_) => EventType::ProfileSnapshot,
            Self::ProfileTaskQuery(_) => EventType::ProfileTaskQuery,
            Self::ProfileTaskFinish(_) => EventType::ProfileTaskFinish,
            Self::EbpfProfilingData(_) => EventType::EbpfProfilingData,
            Self::EbpfProfilingTaskQuery(_) => EventType::EbpfProfilingTaskQuery,
            Self::EbpfProcessPing(_) => EventType::EbpfProcessPing,
            Self::EbpfProcessReport(_) => EventType::EbpfProcessReport,
            Self::EbpfAccessLog(_) => EventType::EbpfAccessLog,
            Self::ConfigurationSync(_) => EventType::ConfigurationSync,
            Self::ContinuousProfilingPolicyQuery(_) => EventType::ContinuousProfilingPolicyQuery,
            Self::ContinuousProfilingReport(_) => EventType::ContinuousProfilingReport,
            Self::AsyncProfilerTaskQuery(_) => EventType::AsyncProfilerTaskQuery,
            Self::AsyncProfilerMetadata(_) => EventType::AsyncProfilerMetadata,
            Self::AsyncProfilerChunk(_) => EventType::AsyncProfilerChunk,
            Self::EnvoyAlsV2(_) => EventType::EnvoyAlsV2,
            Self::EnvoyAlsV3(_) => EventType::EnvoyAlsV3,
            Self::EnvoyMetricsV2(_) => EventType::EnvoyMetricsV2,
            Self::EnvoyMetricsV3(_) => EventType::EnvoyMetricsV3,
            Self::OtlpMetrics(_) => EventType::OtlpMetrics,
            Self::Opaque(_) => EventType::Opaque,
        }
    }

    /// Build a payload from raw wire frames
    ///
    /// Single-message kinds take exactly one frame. List kinds take any
    /// number, one message per frame.
    pub fn from_frames(event_type: EventType, mut frames: Vec<Bytes>) -> Result<Self, ProtocolError> {
        let payload = match event_type {
            EventType::EbpfProfilingData => Self::EbpfProfilingData(frames),
            EventType::EbpfAccessLog => Self::EbpfAccessLog(frames),
            EventType::Opaque => Self::Opaque(frames),
            EventType::EnvoyAlsV2 => Self::EnvoyAlsV2(decode_all(event_type, frames)?),
            EventType::EnvoyAlsV3 => Self::EnvoyAlsV3(decode_all(event_type, frames)?),
            EventType::EnvoyMetricsV2 => Self::EnvoyMetricsV2(decode_all(event_type, frames)?),
            EventType::EnvoyMetricsV3 => Self::EnvoyMetricsV3(decode_all(event_type, frames)?),
            single => {
                if frames.len() != 1 {
                    return Err(ProtocolError::frame_count(single, 1, frames.len()));
                }
                let frame = frames.remove(0);
                Self::from_frame(single, frame)?
            }
        };
        Ok(payload)
    }

    /// Build a single-message payload from one raw frame
    pub fn from_frame(event_type: EventType, frame: Bytes) -> Result<Self, ProtocolError> {
        let payload = match event_type {
            EventType::Segment => Self::Segment(frame),
            EventType::Log => Self::Log(frame),
            EventType::Jvm => Self::Jvm(frame),
            EventType::Clr => Self::Clr(frame),
            EventType::ManagementReport => Self::ManagementReport(frame),
            EventType::ManagementPing => Self::ManagementPing(frame),
            EventType::Event => Self::Event(frame),
            EventType::Meter => Self::Meter(frame),
            EventType::ProfileSnapshot => Self::ProfileSnapshot(frame),
            EventType::ProfileTaskQuery => Self::ProfileTaskQuery(frame),
            EventType::ProfileTaskFinish => Self::ProfileTaskFinish(frame),
            EventType::EbpfProfilingTaskQuery => Self::EbpfProfilingTaskQuery(frame),
            EventType::EbpfProcessPing => Self::EbpfProcessPing(frame),
            EventType::EbpfProcessReport => Self::EbpfProcessReport(frame),
            EventType::ConfigurationSync => Self::ConfigurationSync(
                ConfigurationSyncRequest::decode(frame)
                    .map_err(|e| ProtocolError::decode(event_type, e))?,
            ),
            EventType::ContinuousProfilingPolicyQuery => Self::ContinuousProfilingPolicyQuery(frame),
            EventType::ContinuousProfilingReport => Self::ContinuousProfilingReport(frame),
            EventType::AsyncProfilerTaskQuery => Self::AsyncProfilerTaskQuery(frame),
            EventType::AsyncProfilerMetadata => Self::AsyncProfilerMetadata(frame),
            EventType::AsyncProfilerChunk => Self::AsyncProfilerChunk(frame),
            EventType::OtlpMetrics => Self::OtlpMetrics(frame),
            list => return Self::from_frames(list, vec![frame]),
        };
        Ok(payload)
    }

    /// Serialize back into wire frames, one per message
    pub fn to_frames(&self) -> Vec<Bytes> {
        match self {
            Self::Segment(b)
            | Self::Log(b)
            | Self::Jvm(b)
            | Self::Clr(b)
            | Self::ManagementReport(b)
            | Self::ManagementPing(b)
            | Self::Event(b)
            | Self::Meter(b)
            | Self::ProfileSnapshot(b)
            | Self::ProfileTaskQuery(b)
            | Self::ProfileTaskFinish(b)
            | Self::EbpfProfilingTaskQuery(b)
            | Self::EbpfProcessPing(b)
            | Self::EbpfProcessReport(b)
            | Self::ContinuousProfilingPolicyQuery(b)
            | Self::ContinuousProfilingReport(b)
            | Self::AsyncProfilerTaskQuery(b)
            | Self::AsyncProfilerMetadata(b)
            | Self::AsyncProfilerChunk(b)
            | Self::OtlpMetrics(b) => vec![b.clone()],
            Self::EbpfProfilingData(list) | Self::EbpfAccessLog(list) | Self::Opaque(list) => {
                list.clone()
            }
            Self::ConfigurationSync(req) => vec![Bytes::from(req.encode_to_vec())],
            Self::EnvoyAlsV2(msgs) | Self::EnvoyAlsV3(msgs) => encode_all(msgs),
            Self::EnvoyMetricsV2(msgs) | Self::EnvoyMetricsV3(msgs) => encode_all(msgs),
        }
    }

    /// Number of messages carried
    pub fn item_count(&self) -> usize {
        match self {
            Self::EbpfProfilingData(list) | Self::EbpfAccessLog(list) | Self::Opaque(list) => {
                list.len()
            }
            Self::EnvoyAlsV2(msgs) | Self::EnvoyAlsV3(msgs) => msgs.len(),
            Self::EnvoyMetricsV2(msgs) | Self::EnvoyMetricsV3(msgs) => msgs.len(),
            _ => 1,
        }
    }

    /// Approximate serialized size in bytes
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::ConfigurationSync(req) => req.encoded_len(),
            Self::EnvoyAlsV2(msgs) | Self::EnvoyAlsV3(msgs) => {
                msgs.iter().map(Message::encoded_len).sum()
            }
            Self::EnvoyMetricsV2(msgs) | Self::EnvoyMetricsV3(msgs) => {
                msgs.iter().map(Message::encoded_len).sum()
            }
            other => other.to_frames().iter().map(Bytes::len).sum(),
        }
    }
}

fn decode_all<M: Message + Default>(
    event_type: EventType,
    frames: Vec<Bytes>,
) -> Result<Vec<M>, ProtocolError> {
    frames
        .into_iter()
        .map(|frame| M::decode(frame).map_err(|e| ProtocolError::decode(event_type, e)))
        .collect()
}

fn encode_all<M: Message>(msgs: &[M]) -> Vec<Bytes> {
    msgs.iter()
        .map(|m| Bytes::from(m.encode_to_vec()))
        .collect()
}
