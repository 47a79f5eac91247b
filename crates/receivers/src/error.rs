//! Receiver error types

use satellite_config::{ConfigError, ServerKind};
use thiserror::Error;

/// Result type for receiver and server operations
pub type Result<T> = std::result::Result<T, ReceiverError>;

/// Errors raised while wiring or running receivers and their servers
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Failed to bind the listening socket
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Receiver registered against the wrong server kind
    #[error("receiver '{receiver}' needs a {expected} server, got {actual}")]
    ServerMismatch {
        receiver: String,
        expected: ServerKind,
        actual: ServerKind,
    },

    /// Two receivers claimed the same gRPC method
    #[error("method {0} is already registered")]
    DuplicateMethod(String),

    /// Two receivers claimed the same HTTP route
    #[error("route {0} is already registered")]
    DuplicateRoute(String),

    /// Server settings could not be resolved
    #[error("invalid server configuration: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReceiverError {
    /// Create a bind error
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Create a server mismatch error
    pub fn server_mismatch(
        receiver: impl Into<String>,
        expected: ServerKind,
        actual: ServerKind,
    ) -> Self {
        Self::ServerMismatch {
            receiver: receiver.into(),
            expected,
            actual,
        }
    }
}
