//! Event envelope
//!
//! The uniform record a receiver emits for each inbound protocol message.
//! The envelope's type is derived from its payload, so the two can never
//! disagree.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{EventType, Payload, ProtocolError};

/// Metadata key carrying the receiver name an envelope came through
pub const METADATA_RECEIVER: &str = "receiver";

/// Uniform in-memory event
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Short tag of the producer origin
    pub name: String,
    timestamp_ms: i64,
    /// Free-form string metadata
    pub metadata: HashMap<String, String>,
    event_type: EventType,
    /// True when produced by a remote agent rather than synthesized locally
    pub remote: bool,
    payload: Payload,
}

impl Envelope {
    /// Create a remote envelope stamped with the current time
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            timestamp_ms: now_ms(),
            metadata: HashMap::new(),
            event_type: payload.event_type(),
            remote: true,
            payload,
        }
    }

    /// Create a locally synthesized envelope (responses, acks)
    pub fn synthesized(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            remote: false,
            ..Self::new(name, payload)
        }
    }

    /// Override the timestamp
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Result<Self, ProtocolError> {
        if timestamp_ms < 0 {
            return Err(ProtocolError::NegativeTimestamp(timestamp_ms));
        }
        self.timestamp_ms = timestamp_ms;
        Ok(self)
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    #[inline]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consume the envelope, keeping only the payload
    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

/// Envelope plus the offset assigned by the batch buffer
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEventContext {
    /// Strictly positive, increasing per buffer instance
    pub offset: i64,
    pub envelope: Envelope,
}

impl OutputEventContext {
    pub fn new(offset: i64, envelope: Envelope) -> Self {
        Self { offset, envelope }
    }
}

/// Current epoch milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
