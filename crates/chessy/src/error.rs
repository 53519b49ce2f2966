//! Error types for the ingestion pipeline.
//!
//! The split between `GameParseError` (permanent, data-level) and
//! `StoreError` (transient, infrastructure) is deliberate: the chunk
//! worker branches on the error type to decide between "record a failure
//! and acknowledge" and "do not acknowledge, let the queue redeliver".

use snafu::prelude::*;

pub use chessy_common::error::{ConfigError, StorageError, StoreError};

/// Permanent, data-level errors: this game text will never parse, no
/// matter how many times the chunk is redelivered.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum GameParseError {
    /// The game text is empty or whitespace.
    #[snafu(display("Game text is empty"))]
    EmptyGame,

    /// A header line is not of the form `[Tag "Value"]`.
    #[snafu(display("Malformed header line: {line}"))]
    MalformedHeader { line: String },

    /// The movetext does not end with a result token.
    #[snafu(display("Game has no result token"))]
    MissingResult,

    /// The game has movetext but no header section.
    #[snafu(display("Game has no header section"))]
    MissingHeaders,
}

/// Errors raised while splitting an archive file into chunk tasks.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SplitError {
    /// The archive could not be read from storage. No chunks were
    /// enqueued for the part that failed; the caller retries the file.
    #[snafu(display("Failed to read archive {key}: {source}"))]
    ReadArchive { key: String, source: StorageError },
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Record store error.
    #[snafu(display("Record store error: {source}"))]
    Store { source: StoreError },

    /// Split error.
    #[snafu(display("Split error: {source}"))]
    Split { source: SplitError },

    /// Task join error.
    #[snafu(display("Task join error: {source}"))]
    TaskJoin { source: tokio::task::JoinError },

    /// Metrics error.
    #[snafu(display("Metrics error: {source}"))]
    Metrics {
        source: chessy_common::MetricsError,
    },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<StorageError> for PipelineError {
    fn from(source: StorageError) -> Self {
        PipelineError::Storage { source }
    }
}

impl From<StoreError> for PipelineError {
    fn from(source: StoreError) -> Self {
        PipelineError::Store { source }
    }
}

impl From<SplitError> for PipelineError {
    fn from(source: SplitError) -> Self {
        PipelineError::Split { source }
    }
}
