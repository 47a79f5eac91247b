//! Protocol error types
//!
//! Errors raised while building envelopes or decoding payloads.

use thiserror::Error;

use crate::EventType;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload bytes did not decode as the expected message
    #[error("failed to decode {event_type} payload: {source}")]
    Decode {
        event_type: EventType,
        #[source]
        source: prost::DecodeError,
    },

    /// Wrong number of frames for a single-message kind
    #[error("{event_type} expects {expected} frame(s), got {actual}")]
    FrameCount {
        event_type: EventType,
        expected: usize,
        actual: usize,
    },

    /// Timestamps are milliseconds since epoch and never negative
    #[error("negative timestamp: {0}")]
    NegativeTimestamp(i64),

    /// Unrecognized event type name
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// Invalid event type wire tag
    #[error("invalid event type tag: {0}")]
    InvalidEventTypeTag(u8),
}

impl ProtocolError {
    /// Create a decode error for the given event type
    #[inline]
    pub fn decode(event_type: EventType, source: prost::DecodeError) -> Self {
        Self::Decode { event_type, source }
    }

    /// Create a frame count error
    #[inline]
    pub fn frame_count(event_type: EventType, expected: usize, actual: usize) -> Self {
        Self::FrameCount {
            event_type,
            expected,
            actual,
        }
    }

    /// Check if the error came from malformed agent input
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::FrameCount { .. })
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
