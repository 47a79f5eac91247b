//! HTTP server
//!
//! Axum router the HTTP receivers mount their routes on. Every request
//! runs under the configured timeout; a request that overruns it is
//! answered `503` with a `{status, msg}` body.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use satellite_config::{HttpServerConfig, ServerKind};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{ServerMetrics, ServerMetricsHandle};
use crate::{ReceiverError, Result};

/// JSON body of every HTTP receiver response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    /// `success` or `failing`
    pub status: String,
    pub msg: String,
}

/// Build a `{status, msg}` response
pub fn status_response(code: StatusCode, msg: impl Into<String>) -> Response {
    let status = if code.is_success() { "success" } else { "failing" };
    let body = StatusBody {
        status: status.to_string(),
        msg: msg.into(),
    };
    (code, Json(body)).into_response()
}

/// Agent-facing HTTP server
pub struct HttpServer {
    address: SocketAddr,
    uri: String,
    timeout: Duration,
    router: Router,
    routes: HashSet<String>,
    metrics: Arc<ServerMetrics>,
}

impl HttpServer {
    pub fn new(address: SocketAddr, uri: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address,
            uri: uri.into(),
            timeout,
            router: Router::new(),
            routes: HashSet::new(),
            metrics: Arc::new(ServerMetrics::new()),
        }
    }

    pub fn from_config(config: &HttpServerConfig) -> Result<Self> {
        Ok(Self::new(
            config.socket_addr()?,
            config.uri.clone(),
            config.request_timeout(),
        ))
    }

    #[inline]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Path the log receiver is served on
    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Mount a route
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> Result<()> {
        if !self.routes.insert(path.to_string()) {
            return Err(ReceiverError::DuplicateRoute(path.to_string()));
        }
        let router = std::mem::replace(&mut self.router, Router::new());
        self.router = router.route(path, method_router);
        Ok(())
    }

    pub fn metrics_handle(&self) -> ServerMetricsHandle {
        ServerMetricsHandle::new(ServerKind::Http, Arc::clone(&self.metrics))
    }

    /// Finished router with the timeout layer applied
    pub fn into_router(self) -> Router {
        let guard = Arc::new(RequestGuard {
            timeout: self.timeout,
            metrics: self.metrics,
        });
        self.router
            .layer(middleware::from_fn_with_state(guard, enforce_timeout))
    }

    /// Bind the configured address and serve until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(self.address)
            .await
            .map_err(|e| ReceiverError::bind(self.address.to_string(), e))?;
        self.serve(listener, cancel).await
    }

    /// Serve requests from an already bound listener
    pub async fn serve(self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        info!(
            address = %listener.local_addr()?,
            routes = self.routes.len(),
            "http server listening"
        );

        let app = self.into_router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("http server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("address", &self.address)
            .field("uri", &self.uri)
            .field("timeout", &self.timeout)
            .field("routes", &self.routes)
            .finish()
    }
}

struct RequestGuard {
    timeout: Duration,
    metrics: Arc<ServerMetrics>,
}

async fn enforce_timeout(
    State(guard): State<Arc<RequestGuard>>,
    request: Request,
    next: Next,
) -> Response {
    guard.metrics.request();
    match tokio::time::timeout(guard.timeout, next.run(request)).await {
        Ok(response) => {
            if response.status().is_server_error() {
                guard.metrics.error();
            }
            response
        }
        Err(_) => {
            guard.metrics.rejected();
            status_response(StatusCode::SERVICE_UNAVAILABLE, "request timed out")
        }
    }
}
