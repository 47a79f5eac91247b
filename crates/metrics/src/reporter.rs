//! Periodic metrics reporter
//!
//! Collects snapshots from the pipeline, transport servers, receivers and
//! forwarders at the configured interval and logs them through `tracing`.

use std::sync::Arc;
use std::time::Instant;

use satellite_config::{MetricsConfig, MetricsFormat};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::format::MetricsFormatter;
use crate::{
    CollectedForwarder, CollectedMetrics, CollectedReceiver, CollectedServer,
    ForwarderMetricsProvider, HumanFormatter, JsonFormatter, PipelineMetricsProvider,
    ReceiverMetricsProvider, ServerMetricsProvider,
};

/// Builder for constructing a `MetricsReporter`
#[derive(Default)]
pub struct MetricsReporterBuilder {
    config: Option<MetricsConfig>,
    pipeline: Option<Arc<dyn PipelineMetricsProvider>>,
    servers: Vec<Arc<dyn ServerMetricsProvider>>,
    receivers: Vec<Arc<dyn ReceiverMetricsProvider>>,
    forwarders: Vec<Arc<dyn ForwarderMetricsProvider>>,
}

impl MetricsReporterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: MetricsConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn pipeline(mut self, provider: Arc<dyn PipelineMetricsProvider>) -> Self {
        self.pipeline = Some(provider);
        self
    }

    pub fn server(mut self, provider: Arc<dyn ServerMetricsProvider>) -> Self {
        self.servers.push(provider);
        self
    }

    pub fn receivers(mut self, providers: Vec<Arc<dyn ReceiverMetricsProvider>>) -> Self {
        self.receivers.extend(providers);
        self
    }

    pub fn forwarders(mut self, providers: Vec<Arc<dyn ForwarderMetricsProvider>>) -> Self {
        self.forwarders.extend(providers);
        self
    }

    pub fn build(self) -> MetricsReporter {
        let config = self.config.unwrap_or_default();
        let formatter: Box<dyn MetricsFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        MetricsReporter {
            config,
            formatter,
            pipeline: self.pipeline,
            servers: self.servers,
            receivers: self.receivers,
            forwarders: self.forwarders,
            previous: None,
        }
    }
}

/// Reports metrics from every registered component at a fixed interval
pub struct MetricsReporter {
    config: MetricsConfig,
    formatter: Box<dyn MetricsFormatter>,
    pipeline: Option<Arc<dyn PipelineMetricsProvider>>,
    servers: Vec<Arc<dyn ServerMetricsProvider>>,
    receivers: Vec<Arc<dyn ReceiverMetricsProvider>>,
    forwarders: Vec<Arc<dyn ForwarderMetricsProvider>>,
    previous: Option<CollectedMetrics>,
}

impl MetricsReporter {
    pub fn builder() -> MetricsReporterBuilder {
        MetricsReporterBuilder::new()
    }

    /// Run the reporter until cancellation
    pub async fn run(mut self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("metrics reporting disabled");
            return;
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            interval_secs = self.config.interval.as_secs(),
            format = ?self.config.format,
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }

    /// Collect and report once, returning the formatted output
    pub fn report(&mut self) -> String {
        let metrics = self.collect();
        let rates = self.previous.as_ref().and_then(|prev| metrics.rates(prev));
        let output = self.formatter.format(&metrics, rates.as_ref());

        for line in output.lines() {
            info!("{}", line);
        }

        self.previous = Some(metrics);
        output
    }

    fn collect(&self) -> CollectedMetrics {
        let mut metrics = CollectedMetrics {
            timestamp: Some(Instant::now()),
            ..Default::default()
        };

        if self.config.include_pipeline
            && let Some(ref provider) = self.pipeline
        {
            metrics.pipeline = Some(provider.pipeline_snapshot());
        }

        if self.config.include_servers {
            metrics.servers = self
                .servers
                .iter()
                .map(|s| CollectedServer {
                    server_type: s.server_type().to_string(),
                    snapshot: s.snapshot(),
                })
                .collect();
        }

        if self.config.include_receivers {
            metrics.receivers = self
                .receivers
                .iter()
                .map(|r| CollectedReceiver {
                    id: r.receiver_id().to_string(),
                    receiver_type: r.receiver_type().to_string(),
                    snapshot: r.snapshot(),
                })
                .collect();
        }

        if self.config.include_forwarders {
            metrics.forwarders = self
                .forwarders
                .iter()
                .map(|f| CollectedForwarder {
                    id: f.forwarder_id().to_string(),
                    forwarder_type: f.forwarder_type().to_string(),
                    snapshot: f.snapshot(),
                })
                .collect();
        }

        metrics
    }
}
