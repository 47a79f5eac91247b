//! Process-wide `tracing` setup

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use satellite_config::{LogConfig, LogFormat, LogLevel, LogOutput};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Filter from the highest-precedence source
///
/// `--log-level` wins over `RUST_LOG`, which wins over `[log] level`.
pub fn resolve_filter(cli_level: Option<LogLevel>, config: &LogConfig) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        let overridden = LogConfig {
            level,
            ..config.clone()
        };
        return EnvFilter::try_new(overridden.filter_directive()).context("invalid log level");
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(config.filter_directive()).context("invalid log filter")
}

/// Install the global subscriber
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init_logging(cli_level: Option<LogLevel>, config: &LogConfig) -> Result<()> {
    let filter = resolve_filter(cli_level, config)?;

    let layer = match &config.output {
        LogOutput::Stdout => output_layer(config.format, std::io::stdout, true),
        LogOutput::Stderr => output_layer(config.format, std::io::stderr, true),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            output_layer(config.format, Mutex::new(file), false)
        }
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")
}

fn output_layer<W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}
