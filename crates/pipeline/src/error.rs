//! Pipeline error types

use std::time::Duration;

use satellite_protocol::EventType;
use thiserror::Error;

/// Pipeline wiring and lifecycle errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Two forwarders registered for one event type
    #[error("forwarder '{name}' duplicates '{existing}' for event type {event_type}")]
    DuplicateForwarder {
        event_type: EventType,
        existing: String,
        name: String,
    },

    /// Limiter configuration cannot run
    #[error("invalid limiter config: {0}")]
    InvalidLimiter(&'static str),

    /// Buffer capacity of zero
    #[error("buffer capacity must be greater than 0")]
    ZeroCapacity,

    /// Shutdown did not finish in time
    #[error("pipeline shutdown exceeded {0:?}")]
    ShutdownTimeout(Duration),
}

impl PipelineError {
    pub fn duplicate_forwarder(
        event_type: EventType,
        existing: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DuplicateForwarder {
            event_type,
            existing: existing.into(),
            name: name.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
