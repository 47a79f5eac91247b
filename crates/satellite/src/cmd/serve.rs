//! Serve command - run the satellite until ctrl-c or SIGTERM

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use satellite::{Satellite, init_logging};
use satellite_config::{Config, LogLevel};
use tokio::runtime::{Builder, Runtime};
use tokio::signal;
use tracing::{error, info};

/// Serve command arguments
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, env = "SATELLITE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Run the serve command
pub fn run(args: ServeArgs, log_level: Option<LogLevel>) -> Result<()> {
    let (config, source) = load_config(args.config.as_deref())?;
    init_logging(log_level, &config.log)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %source,
        "satellite starting"
    );

    let runtime = build_runtime(config.global.worker_threads)?;
    let result = runtime.block_on(async {
        let satellite = Satellite::build(&config)?;
        satellite.run(wait_for_shutdown()).await
    });

    if let Err(e) = &result {
        error!(error = %e, "satellite error");
        return result;
    }

    info!("satellite shutdown complete");
    Ok(())
}

/// Load the explicit config, else the first default path that exists, else defaults
fn load_config(path: Option<&Path>) -> Result<(Config, String)> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!(
                "config file not found: {}\n\nTo see the available receivers, run: satellite receivers",
                path.display()
            );
        }
        let config = Config::from_file(path).context("failed to load configuration")?;
        return Ok((config, path.display().to_string()));
    }

    let default_paths = [
        PathBuf::from("configs/satellite.toml"),
        PathBuf::from("satellite.toml"),
    ];
    for path in &default_paths {
        if path.exists() {
            let config = Config::from_file(path).context("failed to load configuration")?;
            return Ok((config, path.display().to_string()));
        }
    }

    Ok((Config::default(), "(defaults)".to_string()))
}

fn build_runtime(worker_threads: Option<usize>) -> Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder.enable_all().thread_name("satellite-worker");
    if let Some(threads) = worker_threads {
        builder.worker_threads(threads.max(1));
    }
    builder.build().context("failed to start async runtime")
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
