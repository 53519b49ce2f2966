//! Chessy query API: serves stored game records over HTTP.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use chessy_api::{ApiConfig, ApiState, router};
use chessy_common::{ObjectRecordStore, StorageProvider, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "chessy-api", about = "Read-only query API over the chessy record store")]
struct CliArgs {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = "chessy-api.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match ApiConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("API server failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Arc::new(StorageProvider::for_url(&config.store.path).await?);
    let state = ApiState {
        store: Arc::new(ObjectRecordStore::new(storage)),
        tables: config.store.tables.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    info!(address = %config.address, store = %config.store.path, "Query API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(chessy_common::shutdown_signal())
        .await?;
    Ok(())
}
