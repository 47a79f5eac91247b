//! Server configuration
//!
//! One RPC server is shared by every RPC receiver; the HTTP server hosts the
//! HTTP receivers. A section that is absent means the server is not started.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Which server a receiver registers with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerKind {
    Grpc,
    Http,
}

impl ServerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Http => "http",
        }
    }
}

impl std::fmt::Display for ServerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[server]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub grpc: Option<GrpcServerConfig>,
    pub http: Option<HttpServerConfig>,
}

impl ServerConfig {
    /// Whether the server of this kind is configured
    pub fn has(&self, kind: ServerKind) -> bool {
        match kind {
            ServerKind::Grpc => self.grpc.is_some(),
            ServerKind::Http => self.http.is_some(),
        }
    }
}

/// `[server.grpc]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrpcServerConfig {
    /// `":PORT"` or `"HOST:PORT"`
    pub address: String,

    /// Largest accepted gRPC message in bytes
    pub max_message_size: usize,

    /// Socket receive buffer size; `None` keeps the OS default
    pub recv_buffer_size: Option<usize>,
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            address: ":11800".into(),
            max_message_size: 16 * 1024 * 1024,
            recv_buffer_size: None,
        }
    }
}

impl GrpcServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        parse_address(&self.address)
    }
}

/// `[server.http]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// `":PORT"` or `"HOST:PORT"`
    pub address: String,

    /// Request path the log receiver is mounted on
    pub uri: String,

    /// Per-request timeout in seconds, answered with 503 on expiry
    pub timeout: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            address: ":12800".into(),
            uri: "/logging".into(),
            timeout: 5,
        }
    }
}

impl HttpServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        parse_address(&self.address)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Resolve a listen address
///
/// `":PORT"` binds every interface; `"HOST:PORT"` accepts an IP literal or a
/// resolvable host name.
pub fn parse_address(address: &str) -> Result<SocketAddr> {
    if let Some(port) = address.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::invalid_address(address, "port is not a number"))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    address
        .to_socket_addrs()
        .map_err(|e| ConfigError::invalid_address(address, e.to_string()))?
        .next()
        .ok_or_else(|| ConfigError::invalid_address(address, "host did not resolve"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_only() {
        let addr = parse_address(":11800").unwrap();
        assert_eq!(addr.port(), 11800);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn test_parse_host_port() {
        let addr = parse_address("127.0.0.1:9000").unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_address(":http").is_err());
        assert!(parse_address(":70000").is_err());
        assert!(parse_address("no-port-here").is_err());
    }

    #[test]
    fn test_sections_absent_by_default() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert!(!config.has(ServerKind::Grpc));
        assert!(!config.has(ServerKind::Http));
    }

    #[test]
    fn test_empty_sections_use_defaults() {
        let config: ServerConfig = toml::from_str("[grpc]\n[http]\n").unwrap();
        let grpc = config.grpc.unwrap();
        let http = config.http.unwrap();
        assert_eq!(grpc.address, ":11800");
        assert_eq!(http.uri, "/logging");
        assert_eq!(http.request_timeout(), Duration::from_secs(5));
    }
}
