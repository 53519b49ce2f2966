//! Chessy CLI: PGN archive ingestion pipeline.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use chessy::{Config, init_tracing, run_pipeline};

#[derive(Parser, Debug)]
#[command(name = "chessy", about = "PGN archive ingestion pipeline")]
struct CliArgs {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = "chessy.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let metrics_addr = match config.metrics.address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid metrics address {}: {e}", config.metrics.address);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = chessy_common::metrics::init_global(metrics_addr) {
        eprintln!("Failed to start metrics server: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        source = %config.source.path,
        store = %config.store.path,
        workers = config.workers,
        "Starting chessy pipeline"
    );

    match run_pipeline(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
