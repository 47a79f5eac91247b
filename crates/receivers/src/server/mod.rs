//! Transport servers shared by receivers
//!
//! Each configured server kind runs once per process. Receivers register
//! their handlers on it before it starts: gRPC receivers add method routes
//! to the `GrpcServer`, the HTTP log receiver adds a path to the
//! `HttpServer`. A receiver handed the wrong kind fails registration.

mod http;
mod grpc;

pub use http::{HttpServer, StatusBody, status_response};
pub use grpc::{CallHandler, GrpcServer, ServerCall};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use satellite_config::{ServerConfig, ServerKind};
use satellite_metrics::{ServerMetricsProvider, ServerMetricsSnapshot};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// A transport server receivers register on
pub enum Server {
    Grpc(GrpcServer),
    Http(HttpServer),
}

impl Server {
    /// Build every server the configuration declares
    pub fn from_config(config: &ServerConfig) -> Result<Vec<Server>> {
        let mut servers = Vec::new();
        if let Some(grpc) = &config.grpc {
            servers.push(Server::Grpc(GrpcServer::from_config(grpc)?));
        }
        if let Some(http) = &config.http {
            servers.push(Server::Http(HttpServer::from_config(http)?));
        }
        Ok(servers)
    }

    pub fn kind(&self) -> ServerKind {
        match self {
            Self::Grpc(_) => ServerKind::Grpc,
            Self::Http(_) => ServerKind::Http,
        }
    }

    pub fn metrics_handle(&self) -> ServerMetricsHandle {
        match self {
            Self::Grpc(server) => server.metrics_handle(),
            Self::Http(server) => server.metrics_handle(),
        }
    }

    /// Bind and serve until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        match self {
            Self::Grpc(server) => server.run(cancel).await,
            Self::Http(server) => server.run(cancel).await,
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grpc(server) => f.debug_tuple("Grpc").field(server).finish(),
            Self::Http(server) => f.debug_tuple("Http").field(server).finish(),
        }
    }
}

/// Counters shared by both server kinds
#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub connections_active: AtomicU64,
    pub connections_total: AtomicU64,
    pub requests_total: AtomicU64,
    /// Calls to unknown methods and timed out requests
    pub requests_rejected: AtomicU64,
    pub errors: AtomicU64,
}

impl ServerMetrics {
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        ServerMetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Handle for the metrics reporter
pub struct ServerMetricsHandle {
    kind: ServerKind,
    metrics: Arc<ServerMetrics>,
}

impl ServerMetricsHandle {
    pub(crate) fn new(kind: ServerKind, metrics: Arc<ServerMetrics>) -> Self {
        Self { kind, metrics }
    }
}

impl ServerMetricsProvider for ServerMetricsHandle {
    fn server_type(&self) -> &str {
        self.kind.as_str()
    }

    fn snapshot(&self) -> ServerMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
