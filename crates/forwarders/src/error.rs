//! Forwarder construction errors

use satellite_protocol::EventType;
use thiserror::Error;

/// Result type for building forwarders
pub type Result<T> = std::result::Result<T, ForwarderError>;

/// Errors raised while building forwarders from configuration
#[derive(Debug, Error)]
pub enum ForwarderError {
    /// The event type has no upstream method to call
    #[error("forwarder '{name}': {event_type} has no upstream method")]
    NoMethod { name: String, event_type: EventType },
}

impl ForwarderError {
    pub fn no_method(name: impl Into<String>, event_type: EventType) -> Self {
        Self::NoMethod {
            name: name.into(),
            event_type,
        }
    }
}
