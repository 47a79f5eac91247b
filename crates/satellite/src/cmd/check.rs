//! Check command - validate a config file and print its wiring

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use satellite::wiring_report;
use satellite_config::Config;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the configuration file to validate
    #[arg(short, long)]
    pub config: PathBuf,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let config = Config::from_file(&args.config)
        .with_context(|| format!("{} is not a valid configuration", args.config.display()))?;
    let report = wiring_report(&config)?;

    println!("{}: ok", args.config.display());
    print!("{report}");
    Ok(())
}
