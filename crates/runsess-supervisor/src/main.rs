//! Trading session runner - entry point.
//!
//! Builds the engine, runs one supervised session (engine + monitor +
//! market data feeder), tears everything down and triggers the report.

use anyhow::Result;
use clap::Parser;
use runsess_supervisor::{SessionConfig, SessionSupervisor};
use tracing::{error, info};

/// Trading session runner
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RUNSESS_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the run duration in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Disable the live quote fetch and use synthetic data only
    #[arg(long)]
    synthetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    runsess_telemetry::init_logging()?;

    info!("Starting session runner v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > RUNSESS_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("RUNSESS_CONFIG").ok())
        .unwrap_or_else(|| "config/runsess.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let mut config = SessionConfig::load_or_default(&config_path);

    if let Some(duration) = args.duration {
        config.run_duration_secs = duration;
    }
    if args.synthetic {
        config.feed.synthetic = true;
    }
    config.validate()?;

    info!(
        duration_secs = config.run_duration_secs,
        result_dir = %config.result_dir.display(),
        synthetic = config.feed.synthetic,
        "Configuration loaded"
    );

    let mut supervisor = SessionSupervisor::new(config);
    match supervisor.run().await {
        Ok(outcome) => {
            info!(?outcome, "Session finished");
            Ok(())
        }
        Err(e) => {
            error!(%e, state = %supervisor.state(), "Session failed");
            Err(e.into())
        }
    }
}
