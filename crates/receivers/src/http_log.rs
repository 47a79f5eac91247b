//! HTTP log receiver
//!
//! Accepts one protobuf `LogData` per POST body on the HTTP server's
//! configured path. The body is validated, then emitted as an opaque log
//! payload exactly as received.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | accepted | 200 `success` |
//! | body does not decode | 400 `failing` |
//! | pipeline gone | 500 `failing` |
//! | handler overran the server timeout | 503 `failing` |

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::post;
use bytes::Bytes;
use crossfire::AsyncRx;
use prost::Message;
use satellite_config::{ReceiverConfig, ReceiverKind, ServerKind};
use satellite_protocol::proto::LogData;
use satellite_protocol::{Envelope, Payload};
use tracing::debug;

use crate::receiver::{Receiver, ReceiverContext, ReceiverMetricsHandle};
use crate::server::{Server, status_response};
use crate::{ReceiverError, Result};

/// Receiver for SkyWalking logs over HTTP
pub struct HttpLogReceiver {
    ctx: Arc<ReceiverContext>,
}

impl HttpLogReceiver {
    pub fn new(config: &ReceiverConfig) -> Self {
        Self {
            ctx: Arc::new(ReceiverContext::new(config.name.clone(), config.kind)),
        }
    }
}

impl Receiver for HttpLogReceiver {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn kind(&self) -> ReceiverKind {
        self.ctx.kind
    }

    fn register_handler(&self, server: &mut Server) -> Result<()> {
        let actual = server.kind();
        let Server::Http(http) = server else {
            return Err(ReceiverError::server_mismatch(
                self.name(),
                ServerKind::Http,
                actual,
            ));
        };
        let uri = http.uri().to_string();
        http.route(&uri, post(ingest_log).with_state(Arc::clone(&self.ctx)))?;
        debug!(receiver = self.name(), uri = %uri, "registered http route");
        Ok(())
    }

    fn channel(&self) -> Option<AsyncRx<Envelope>> {
        self.ctx.take_channel()
    }

    fn metrics_handle(&self) -> ReceiverMetricsHandle {
        self.ctx.metrics_handle()
    }
}

async fn ingest_log(State(ctx): State<Arc<ReceiverContext>>, body: Bytes) -> Response {
    ctx.metrics.frame_received(body.len() as u64);

    if let Err(e) = LogData::decode(body.clone()) {
        ctx.metrics.decode_error();
        return status_response(StatusCode::BAD_REQUEST, format!("invalid log data: {e}"));
    }

    match ctx.emit(Payload::Log(body)).await {
        Ok(()) => status_response(StatusCode::OK, "log received"),
        Err(_) => status_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "pipeline is shutting down",
        ),
    }
}

#[cfg(test)]
#[path = "http_log_test.rs"]
mod tests;
