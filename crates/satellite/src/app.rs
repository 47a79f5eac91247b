//! Process assembly
//!
//! One `Satellite` owns everything a configuration starts. `build` wires
//! the parts in dependency order:
//!
//! ```text
//! forwarders (prepared with the upstream client)
//!     └─► pipeline lanes + limiters
//!            ├─► receiver channels attached as fan-in readers
//!            └─► sync invoker handed to receivers that relay
//! receivers ──► handlers registered on their server
//! ```
//!
//! `run` serves until the shutdown future resolves or a server fails, then
//! stops the servers first and the pipeline second so every accepted
//! envelope reaches a final flush.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use satellite_config::{Config, ServerKind};
use satellite_forwarders::{ForwarderPlugin, UpstreamClient};
use satellite_metrics::{ForwarderMetricsProvider, MetricsReporter, ReceiverMetricsProvider};
use satellite_pipeline::{LaneConfig, Pipeline, PipelineBuilder};
use satellite_protocol::EventType;
use satellite_receivers::{Receiver, Server, build_receiver};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type ServerExit = (ServerKind, satellite_receivers::Result<()>);

/// A fully wired satellite, ready to serve
pub struct Satellite {
    servers: Vec<Server>,
    pipeline: Pipeline,
    reporter: MetricsReporter,
    shutdown_timeout: Duration,
}

impl Satellite {
    /// Wire every enabled component
    ///
    /// Must be called inside a Tokio runtime: the pipeline starts its
    /// limiters here. Nothing is bound until `run`.
    pub fn build(config: &Config) -> Result<Self> {
        let upstream = UpstreamClient::from_config(&config.upstream).with_context(|| {
            format!("invalid upstream address '{}'", config.upstream.address)
        })?;
        let upstream = Arc::new(upstream);
        let mut builder = PipelineBuilder::new(LaneConfig::from_config(&config.pipeline));
        let mut forwarder_metrics: Vec<Arc<dyn ForwarderMetricsProvider>> = Vec::new();

        for forwarder_config in config.enabled_forwarders() {
            let plugin = ForwarderPlugin::from_config(forwarder_config).with_context(|| {
                format!("failed to create forwarder '{}'", forwarder_config.name)
            })?;
            plugin.prepare(&upstream);
            forwarder_metrics.push(Arc::new(plugin.metrics_handle()));
            builder
                .add_forwarder(plugin.forwarder())
                .context("failed to register forwarder")?;

            info!(
                forwarder = %forwarder_config.name,
                kind = %plugin.kind(),
                event_type = %plugin.forward_type(),
                "forwarder ready"
            );
        }

        let mut pipeline = builder.build().context("failed to start pipeline")?;

        let mut servers = Vec::new();
        for server in Server::from_config(&config.server).context("failed to create servers")? {
            if config.needs_server(server.kind()) {
                servers.push(server);
            } else {
                info!(server = server.kind().as_str(), "no receiver uses this server, skipping");
            }
        }

        let mut receiver_metrics: Vec<Arc<dyn ReceiverMetricsProvider>> = Vec::new();
        for receiver_config in config.enabled_receivers() {
            let receiver: Box<dyn Receiver> = build_receiver(receiver_config);
            let server_kind = receiver.kind().server();
            let server = servers
                .iter_mut()
                .find(|server| server.kind() == server_kind)
                .with_context(|| {
                    format!(
                        "receiver '{}' needs the {} server",
                        receiver.name(),
                        server_kind.as_str()
                    )
                })?;

            receiver
                .register_handler(server)
                .with_context(|| format!("failed to register receiver '{}'", receiver.name()))?;
            if receiver.kind().needs_sync_invoker() {
                receiver.register_sync_invoker(pipeline.sync_invoker());
            }
            if let Some(channel) = receiver.channel() {
                pipeline.attach(receiver.name(), channel);
            }
            receiver_metrics.push(Arc::new(receiver.metrics_handle()));

            info!(
                receiver = %receiver.name(),
                kind = %receiver.kind(),
                server = server_kind.as_str(),
                "receiver ready"
            );
        }

        let mut reporter = MetricsReporter::builder()
            .config(config.metrics.clone())
            .pipeline(Arc::new(pipeline.metrics_handle()));
        for server in &servers {
            reporter = reporter.server(Arc::new(server.metrics_handle()));
        }
        let reporter = reporter
            .receivers(receiver_metrics)
            .forwarders(forwarder_metrics)
            .build();

        if servers.is_empty() {
            warn!("no receivers enabled, nothing will be accepted");
        }

        Ok(Self {
            servers,
            pipeline,
            reporter,
            shutdown_timeout: config.global.shutdown_timeout,
        })
    }

    /// Event types with a pipeline lane
    pub fn event_types(&self) -> Vec<EventType> {
        self.pipeline.event_types()
    }

    /// Serve until `shutdown` resolves or a server stops on its own
    ///
    /// Either way the servers are stopped, then the pipeline drains with a
    /// final flush per lane. A server failure is returned after the drain.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let cancel = CancellationToken::new();
        let reporter = tokio::spawn(self.reporter.run(cancel.clone()));

        let mut servers = JoinSet::new();
        for server in self.servers {
            let kind = server.kind();
            let cancel = cancel.clone();
            servers.spawn(async move { (kind, server.run(cancel).await) });
        }

        info!(
            servers = servers.len(),
            event_types = ?self.pipeline.event_types(),
            "satellite running"
        );

        let outcome = tokio::select! {
            () = shutdown => {
                info!("shutdown signal received, stopping satellite...");
                Ok(())
            }
            Some(joined) = servers.join_next() => Err(server_exit(joined)),
        };

        cancel.cancel();

        debug!("waiting for servers to stop");
        let stopped = tokio::time::timeout(self.shutdown_timeout, async {
            while let Some(joined) = servers.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => {}
                    Ok((kind, Err(e))) => {
                        warn!(server = kind.as_str(), error = %e, "server stopped with error")
                    }
                    Err(e) => warn!(error = %e, "server task panicked"),
                }
            }
        })
        .await;
        if stopped.is_err() {
            warn!("servers did not stop within timeout, aborting");
            servers.abort_all();
        }

        debug!("draining pipeline");
        let drained = self.pipeline.shutdown(self.shutdown_timeout).await;

        if let Err(e) = reporter.await {
            warn!(error = %e, "metrics reporter panicked");
        }

        outcome?;
        drained.context("pipeline did not drain before the shutdown timeout")?;
        info!("satellite stopped");
        Ok(())
    }
}

fn server_exit(joined: std::result::Result<ServerExit, JoinError>) -> anyhow::Error {
    match joined {
        Ok((kind, Ok(()))) => anyhow!("{} server stopped unexpectedly", kind.as_str()),
        Ok((kind, Err(e))) => anyhow::Error::new(e).context(format!("{} server failed", kind.as_str())),
        Err(e) => anyhow::Error::new(e).context("server task panicked"),
    }
}

impl std::fmt::Debug for Satellite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Satellite")
            .field("servers", &self.servers)
            .field("pipeline", &self.pipeline)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}
