//! gRPC server
//!
//! Accepts agent connections, serves HTTP/2 on each and dispatches every
//! call to the handler registered for its method path. Calls go through
//! `tonic::server::Grpc` with `RawCodec`, so handlers see the agent's
//! original message bytes. Every method is served as a bidirectional
//! stream, which is wire-compatible with unary and client-stream clients.
//!
//! Unknown methods are answered with `UNIMPLEMENTED`. On shutdown each
//! connection is drained with GOAWAY, open calls observe the cancellation
//! and end with `CANCELLED`, and `serve` returns only once every
//! connection and call task has finished.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::{self, BoxFuture, Ready};
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper_util::rt::{TokioExecutor, TokioIo};
use satellite_config::{GrpcServerConfig, ServerKind};
use satellite_protocol::rpc::{MAX_MESSAGE_SIZE, RawCodec, Status, Streaming};
use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tonic::body::BoxBody;
use tonic::server::{Grpc, StreamingService};
use tracing::{debug, info, warn};

use super::{ServerMetrics, ServerMetricsHandle};
use crate::{ReceiverError, Result};

/// Response messages queued ahead of the connection
const RESPONSE_BUFFER: usize = 16;

type ResponseStream = BoxStream<'static, std::result::Result<Bytes, Status>>;
type Outbound = mpsc::Sender<std::result::Result<Bytes, Status>>;

/// Server side of one call
pub struct ServerCall {
    method: String,
    inbound: BoxStream<'static, std::result::Result<Bytes, Status>>,
    outbound: Outbound,
    half_closed: bool,
    shutdown: CancellationToken,
}

impl ServerCall {
    /// Call reading from `inbound` and answering into `outbound`
    ///
    /// `shutdown` cancels every pending receive and send.
    pub fn new(
        method: impl Into<String>,
        inbound: impl Stream<Item = std::result::Result<Bytes, Status>> + Send + 'static,
        outbound: Outbound,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            method: method.into(),
            inbound: inbound.boxed(),
            outbound,
            half_closed: false,
            shutdown,
        }
    }

    /// Method path requested by the client
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Fires when the server shuts down
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Next request message, `None` once the client half-closed
    pub async fn recv_message(&mut self) -> std::result::Result<Option<Bytes>, Status> {
        if self.half_closed {
            return Ok(None);
        }
        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => Err(shutting_down()),
            next = self.inbound.next() => match next {
                Some(message) => message.map(Some),
                None => {
                    self.half_closed = true;
                    Ok(None)
                }
            },
        }
    }

    /// Send one response message
    pub async fn send_message(&mut self, message: Bytes) -> std::result::Result<(), Status> {
        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => Err(shutting_down()),
            sent = self.outbound.send(Ok(message)) => {
                sent.map_err(|_| Status::cancelled("client went away"))
            }
        }
    }
}

impl std::fmt::Debug for ServerCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCall")
            .field("method", &self.method)
            .field("half_closed", &self.half_closed)
            .finish()
    }
}

fn shutting_down() -> Status {
    Status::cancelled("server shutting down")
}

/// Handles calls on one method path
#[async_trait]
pub trait CallHandler: Send + Sync {
    /// Serve one call; an error ends it with that status
    async fn handle(&self, call: &mut ServerCall) -> std::result::Result<(), Status>;
}

type Routes = HashMap<&'static str, Arc<dyn CallHandler>>;

/// Agent-facing gRPC server
pub struct GrpcServer {
    address: SocketAddr,
    max_message_size: usize,
    recv_buffer_size: Option<usize>,
    routes: Routes,
    metrics: Arc<ServerMetrics>,
}

impl GrpcServer {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            max_message_size: MAX_MESSAGE_SIZE,
            recv_buffer_size: None,
            routes: HashMap::new(),
            metrics: Arc::new(ServerMetrics::new()),
        }
    }

    pub fn from_config(config: &GrpcServerConfig) -> Result<Self> {
        let mut server = Self::new(config.socket_addr()?);
        server.max_message_size = config.max_message_size;
        server.recv_buffer_size = config.recv_buffer_size;
        Ok(server)
    }

    #[inline]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Register the handler for a method path
    pub fn register(&mut self, method: &'static str, handler: Arc<dyn CallHandler>) -> Result<()> {
        if self.routes.contains_key(method) {
            return Err(ReceiverError::DuplicateMethod(method.to_string()));
        }
        self.routes.insert(method, handler);
        Ok(())
    }

    /// Registered method paths, sorted
    pub fn methods(&self) -> Vec<&'static str> {
        let mut methods: Vec<_> = self.routes.keys().copied().collect();
        methods.sort_unstable();
        methods
    }

    pub fn metrics_handle(&self) -> ServerMetricsHandle {
        ServerMetricsHandle::new(ServerKind::Grpc, Arc::clone(&self.metrics))
    }

    /// Bind the configured address and serve until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(self.address)
            .await
            .map_err(|e| ReceiverError::bind(self.address.to_string(), e))?;
        self.serve(listener, cancel).await
    }

    /// Serve calls from an already bound listener
    ///
    /// Returns after `cancel` fired and every connection has drained.
    pub async fn serve(self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        let Self {
            max_message_size,
            recv_buffer_size,
            routes,
            metrics,
            ..
        } = self;
        let tracker = TaskTracker::new();
        let router = CallRouter {
            routes: Arc::new(routes),
            max_message_size,
            metrics: Arc::clone(&metrics),
            tracker: tracker.clone(),
            shutdown: cancel.clone(),
        };

        info!(
            address = %listener.local_addr()?,
            methods = router.routes.len(),
            "grpc server listening"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("grpc server shutting down");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            configure_socket(&stream, recv_buffer_size);
                            metrics.connection_opened();

                            let router = router.clone();
                            let metrics = Arc::clone(&metrics);
                            let cancel = cancel.clone();
                            tracker.spawn(async move {
                                serve_connection(stream, peer, router, &cancel).await;
                                metrics.connection_closed();
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to accept connection");
                            metrics.error();
                        }
                    }
                }
            }
        }

        drop(listener);
        tracker.close();
        tracker.wait().await;
        debug!("grpc connections drained");
        Ok(())
    }
}

impl std::fmt::Debug for GrpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcServer")
            .field("address", &self.address)
            .field("max_message_size", &self.max_message_size)
            .field("methods", &self.methods())
            .finish()
    }
}

/// Serve HTTP/2 on one connection, draining it when `cancel` fires
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: CallRouter,
    cancel: &CancellationToken,
) {
    let connection =
        http2::Builder::new(TokioExecutor::new()).serve_connection(TokioIo::new(stream), router);
    let mut connection = pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = cancel.cancelled() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };
    if let Err(e) = result {
        debug!(%peer, error = %e, "connection ended with error");
    }
}

/// Routes each HTTP/2 request to the call handler for its path
#[derive(Clone)]
struct CallRouter {
    routes: Arc<Routes>,
    max_message_size: usize,
    metrics: Arc<ServerMetrics>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl CallRouter {
    /// Start the handler task for one call and hand back its responses
    fn start(
        &self,
        method: &str,
        inbound: Streaming<Bytes>,
    ) -> std::result::Result<tonic::Response<ResponseStream>, Status> {
        self.metrics.request();
        let Some(handler) = self.routes.get(method).cloned() else {
            self.metrics.rejected();
            debug!(method, "unknown method");
            return Err(Status::unimplemented(format!("unknown method {method}")));
        };

        let (outbound, responses) = mpsc::channel(RESPONSE_BUFFER);
        let mut call = ServerCall::new(method, inbound, outbound.clone(), self.shutdown.clone());
        let metrics = Arc::clone(&self.metrics);
        self.tracker.spawn(async move {
            if let Err(status) = handler.handle(&mut call).await {
                metrics.error();
                debug!(
                    method = call.method(),
                    code = ?status.code(),
                    message = status.message(),
                    "call failed"
                );
                // Ignored when the client already went away
                let _ = outbound.send(Err(status)).await;
            }
        });

        let responses = stream::unfold(responses, |mut responses| async move {
            responses.recv().await.map(|item| (item, responses))
        });
        Ok(tonic::Response::new(responses.boxed()))
    }
}

impl hyper::service::Service<http::Request<Incoming>> for CallRouter {
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Infallible>>;

    fn call(&self, request: http::Request<Incoming>) -> Self::Future {
        let call = MethodCall {
            method: request.uri().path().to_string(),
            router: self.clone(),
        };
        let mut grpc = Grpc::new(RawCodec).max_decoding_message_size(self.max_message_size);
        Box::pin(async move { Ok(grpc.streaming(call, request).await) })
    }
}

/// One call on its way through `tonic::server::Grpc`
struct MethodCall {
    method: String,
    router: CallRouter,
}

impl StreamingService<Bytes> for MethodCall {
    type Response = Bytes;
    type ResponseStream = ResponseStream;
    type Future = Ready<std::result::Result<tonic::Response<ResponseStream>, Status>>;

    fn call(&mut self, request: tonic::Request<Streaming<Bytes>>) -> Self::Future {
        future::ready(self.router.start(&self.method, request.into_inner()))
    }
}

fn configure_socket(stream: &TcpStream, recv_buffer_size: Option<usize>) {
    let socket = SockRef::from(stream);

    if socket.set_tcp_nodelay(true).is_err() {
        debug!("failed to set TCP_NODELAY");
    }

    if let Some(size) = recv_buffer_size
        && let Err(e) = socket.set_recv_buffer_size(size)
    {
        debug!(error = %e, "failed to set SO_RCVBUF");
    }

    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(60))
        .with_interval(Duration::from_secs(10));
    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        debug!(error = %e, "failed to set TCP keepalive");
    }
}
