//! Protobuf messages the satellite looks inside of
//!
//! Only the fields the satellite reads are declared. Nested messages the
//! satellite passes through untouched are kept as raw length-delimited
//! `bytes` fields, which is wire-compatible with the embedded message and
//! preserves every field on re-encode.

use bytes::Bytes;
use prost::Message;

/// Agent configuration discovery request
#[derive(Clone, PartialEq, Message)]
pub struct ConfigurationSyncRequest {
    #[prost(string, tag = "1")]
    pub service: String,
    #[prost(string, tag = "2")]
    pub uuid: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct KeyStringValuePair {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Command {
    #[prost(string, tag = "1")]
    pub command: String,
    #[prost(message, repeated, tag = "2")]
    pub args: Vec<KeyStringValuePair>,
}

/// Downstream command list; the empty list is the standard ACK
#[derive(Clone, PartialEq, Message)]
pub struct Commands {
    #[prost(message, repeated, tag = "1")]
    pub commands: Vec<Command>,
}

/// Leading fields of a log record, used to validate HTTP log uploads
#[derive(Clone, PartialEq, Message)]
pub struct LogData {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(string, tag = "2")]
    pub service: String,
    #[prost(string, tag = "3")]
    pub service_instance: String,
}

/// Envoy node, decoded on demand from an identifier
#[derive(Clone, PartialEq, Message)]
pub struct Node {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub cluster: String,
}

/// First-frame stream identifier sent by Envoy
#[derive(Clone, PartialEq, Message)]
pub struct Identifier {
    #[prost(bytes = "bytes", optional, tag = "1")]
    pub node: Option<Bytes>,
    #[prost(string, tag = "2")]
    pub log_name: String,
}

impl Identifier {
    /// Build an identifier from a node and log name
    pub fn new(node: Node, log_name: impl Into<String>) -> Self {
        Self {
            node: Some(Bytes::from(node.encode_to_vec())),
            log_name: log_name.into(),
        }
    }

    /// Decode the embedded node, if any
    pub fn decode_node(&self) -> Option<Node> {
        self.node
            .as_ref()
            .and_then(|raw| Node::decode(raw.clone()).ok())
    }
}

/// Envoy access log stream message (v2 and v3 share the outer layout)
#[derive(Clone, PartialEq, Message)]
pub struct StreamAccessLogsMessage {
    #[prost(message, optional, tag = "1")]
    pub identifier: Option<Identifier>,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub http_logs: Option<Bytes>,
    #[prost(bytes = "bytes", optional, tag = "3")]
    pub tcp_logs: Option<Bytes>,
}

/// Envoy metrics stream message (v2 and v3 share the outer layout)
#[derive(Clone, PartialEq, Message)]
pub struct StreamMetricsMessage {
    #[prost(message, optional, tag = "1")]
    pub identifier: Option<Identifier>,
    #[prost(bytes = "bytes", repeated, tag = "2")]
    pub envoy_metrics: Vec<Bytes>,
}

/// Messages carrying a first-frame-only identifier
pub trait Identified {
    fn identifier(&self) -> Option<&Identifier>;

    fn set_identifier(&mut self, identifier: Identifier);
}

impl Identified for StreamAccessLogsMessage {
    fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    fn set_identifier(&mut self, identifier: Identifier) {
        self.identifier = Some(identifier);
    }
}

impl Identified for StreamMetricsMessage {
    fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    fn set_identifier(&mut self, identifier: Identifier) {
        self.identifier = Some(identifier);
    }
}
