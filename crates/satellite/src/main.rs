//! Satellite - telemetry ingestion sidecar
//!
//! # Usage
//!
//! ```bash
//! # Run with the default config search (configs/satellite.toml, satellite.toml)
//! satellite
//! satellite serve --config configs/satellite.toml
//!
//! # Validate a config and print what it wires together
//! satellite check --config configs/satellite.toml
//!
//! # List receiver and forwarder kinds with a starter config
//! satellite receivers
//! satellite forwarders --event-type log
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use satellite_config::LogLevel;

/// Satellite - telemetry ingestion sidecar
#[derive(Parser, Debug)]
#[command(name = "satellite")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (trace, debug, info, warn, error). Overrides RUST_LOG and the config file.
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the satellite (default)
    Serve(cmd::serve::ServeArgs),

    /// Validate a config file and print its wiring
    Check(cmd::check::CheckArgs),

    /// List receiver kinds with their default config
    Receivers,

    /// List forwarder kinds with their default config
    Forwarders(cmd::list::ForwardersArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => cmd::serve::run(args, cli.log_level),
        // Check and the listings print to stdout and don't need logging
        Some(Command::Check(args)) => cmd::check::run(args),
        Some(Command::Receivers) => cmd::list::receivers(),
        Some(Command::Forwarders(args)) => cmd::list::forwarders(args),
        None => cmd::serve::run(cmd::serve::ServeArgs::default(), cli.log_level),
    }
}
