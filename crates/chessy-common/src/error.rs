//! Common error types shared between the pipeline and the read API.
//!
//! This module defines error types for storage, configuration, metrics,
//! and record-store operations that are used by both binaries.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during object storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// Archive file is not valid UTF-8.
    #[snafu(display("File {path} is not valid UTF-8"))]
    NotUtf8 { path: String },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Record Store Errors ============

/// Errors that can occur against the record store.
///
/// Record store failures are always treated as transient by the pipeline:
/// the in-flight chunk is not acknowledged and the queue redelivers it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// Underlying storage failed.
    #[snafu(display("Record store storage failed: {source}"))]
    StoreStorage { source: StorageError },

    /// Failed to serialize a record document.
    #[snafu(display("Failed to serialize record {id} for table {table}"))]
    StoreSerialize {
        table: String,
        id: String,
        source: serde_json::Error,
    },

    /// A stored document could not be decoded.
    #[snafu(display("Corrupt record {id} in table {table}"))]
    StoreDecode {
        table: String,
        id: String,
        source: serde_json::Error,
    },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Source path is empty.
    #[snafu(display("Source path cannot be empty"))]
    EmptySourcePath,

    /// Record store path is empty.
    #[snafu(display("Record store path cannot be empty"))]
    EmptyStorePath,

    /// Chunk size must be at least one game.
    #[snafu(display("Chunk size must be greater than zero"))]
    ZeroChunkSize,

    /// Worker count must be at least one.
    #[snafu(display("Worker count must be greater than zero"))]
    ZeroWorkers,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },

    /// Failed to parse a listen address.
    #[snafu(display("Failed to parse listen address {address}"))]
    AddressParse {
        address: String,
        source: std::net::AddrParseError,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Metrics already initialized.
    #[snafu(display("Metrics subsystem is already initialized"))]
    AlreadyInitialized,

    /// Metrics not initialized.
    #[snafu(display("Metrics subsystem is not initialized"))]
    NotInitialized,
}
