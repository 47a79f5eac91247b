//! Configuration error types

use std::io;

use satellite_protocol::EventType;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Two components of the same kind share a name
    #[error("{component} name '{name}' is used more than once")]
    DuplicateName {
        /// Component type ("receiver", "forwarder")
        component: &'static str,
        /// The repeated name
        name: String,
    },

    /// An enabled receiver needs a server section that is absent
    #[error("receiver '{receiver}' needs the [server.{server}] section")]
    MissingServer {
        /// Receiver name
        receiver: String,
        /// Server kind ("grpc", "http")
        server: &'static str,
    },

    /// An event type emitted by a receiver has no forwarder
    #[error("receiver '{receiver}' emits '{event_type}' but no forwarder handles it")]
    NoForwarder {
        /// Receiver name
        receiver: String,
        /// Unserved event type
        event_type: EventType,
    },

    /// Two forwarders claim the same event type
    #[error("forwarders '{first}' and '{second}' both handle '{event_type}'")]
    DuplicateForwarder {
        /// The contested event type
        event_type: EventType,
        /// Forwarder declared first
        first: String,
        /// Forwarder declared second
        second: String,
    },

    /// Address is neither ":PORT" nor "HOST:PORT"
    #[error("invalid address '{address}': {message}")]
    InvalidAddress {
        /// The offending address
        address: String,
        /// What is wrong with it
        message: String,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create a DuplicateName error
    pub fn duplicate_name(component: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            component,
            name: name.into(),
        }
    }

    /// Create a MissingServer error
    pub fn missing_server(receiver: impl Into<String>, server: &'static str) -> Self {
        Self::MissingServer {
            receiver: receiver.into(),
            server,
        }
    }

    /// Create a NoForwarder error
    pub fn no_forwarder(receiver: impl Into<String>, event_type: EventType) -> Self {
        Self::NoForwarder {
            receiver: receiver.into(),
            event_type,
        }
    }

    /// Create a DuplicateForwarder error
    pub fn duplicate_forwarder(
        event_type: EventType,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicateForwarder {
            event_type,
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create an InvalidAddress error
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
