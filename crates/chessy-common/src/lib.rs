//! Shared infrastructure for the chessy ingestion pipeline.
//!
//! This crate holds everything both binaries (`chessy`, the pipeline, and
//! `chessy-api`, the read API) depend on: the record store contract and
//! implementations, the object storage abstraction, configuration loading,
//! error types, metrics, and shutdown signaling.

pub mod config;
pub mod error;
pub mod metrics;
pub mod polling;
pub mod signal;
pub mod storage;
pub mod store;

pub use config::{MetricsConfig, TableNames};
pub use error::{ConfigError, MetricsError, StorageError, StoreError};
pub use signal::shutdown_signal;
pub use storage::{StorageProvider, StorageProviderRef};
pub use store::{MemoryRecordStore, ObjectRecordStore, RecordStore, RecordStoreRef};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize tracing for CLI applications.
///
/// Uses `RUST_LOG` for filtering, defaulting to `info` level.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}
