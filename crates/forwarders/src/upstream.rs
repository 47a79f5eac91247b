//! Upstream collector client
//!
//! Every forwarder shares one HTTP/2 channel to the collector, so calls
//! multiplex over a single connection. The channel connects on first use
//! and reconnects on its own after a failure; each call is bounded by the
//! request timeout.

use std::future::Future;
use std::time::Duration;

use satellite_config::UpstreamConfig;
use satellite_protocol::rpc::{self, Channel, ClientCall, Endpoint, RpcError};
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::debug;

/// Shared channel to the upstream collector
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    address: String,
    endpoint: Endpoint,
    channel: OnceCell<Channel>,
    request_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(address: impl Into<String>) -> Result<Self, RpcError> {
        Self::from_config(&UpstreamConfig {
            address: address.into(),
            ..UpstreamConfig::default()
        })
    }

    /// Fails when the address is not a valid URI authority
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, RpcError> {
        let endpoint = rpc::endpoint(&config.address)?
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .tcp_keepalive(Some(Duration::from_secs(30)));
        Ok(Self {
            address: config.address.clone(),
            endpoint,
            channel: OnceCell::new(),
            request_timeout: config.request_timeout,
        })
    }

    /// Set the bound on one whole call
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Open a call on `method`
    pub async fn open(&self, method: &str) -> Result<ClientCall, RpcError> {
        let channel = self.channel().await?;
        ClientCall::open(channel, method).await
    }

    /// Run `call` under the request timeout
    pub async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RpcError>>,
    ) -> Result<T, RpcError> {
        timeout(self.request_timeout, call)
            .await
            .map_err(|_| RpcError::timeout(operation))?
    }

    async fn channel(&self) -> Result<Channel, RpcError> {
        let channel = self
            .channel
            .get_or_try_init(|| async {
                let channel = self.endpoint.connect().await?;
                debug!(upstream = %self.address, "connected to upstream");
                Ok::<_, RpcError>(channel)
            })
            .await?;
        Ok(channel.clone())
    }
}
