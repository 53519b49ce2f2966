//! Chessy: PGN archive ingestion pipeline.
//!
//! This crate handles:
//! - Splitting uploaded PGN archives into bounded-size chunk tasks
//! - A lease-with-timeout work queue with dead-letter redrive
//! - Parsing games and persisting them with idempotent, deterministic ids
//! - Converting exhausted tasks into durable failure records

pub mod config;
pub mod dlq;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod queue;
pub mod records;
pub mod splitter;

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::run_pipeline;

// Re-export from chessy-common
pub use chessy_common::{init_tracing, shutdown_signal};
