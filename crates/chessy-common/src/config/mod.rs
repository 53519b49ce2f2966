//! Shared configuration types and loading helpers.
//!
//! Component configuration is always constructed once at process start
//! (from a YAML file with environment variable interpolation) and threaded
//! into each component explicitly. Components never read ambient globals.

mod vars;

pub use vars::{InterpolationResult, interpolate};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default metrics listen address.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address for the Prometheus `/metrics` endpoint.
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    DEFAULT_METRICS_ADDR.to_string()
}

/// Names of the five logical record-store tables.
///
/// Defaults mirror the table set the pipeline has always used; deployments
/// override them through config, never through code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableNames {
    #[serde(default = "default_games")]
    pub games: String,
    #[serde(default = "default_games_failed")]
    pub games_failed: String,
    #[serde(default = "default_games_succeeded")]
    pub games_succeeded: String,
    #[serde(default = "default_pgn_files_failed")]
    pub pgn_files_failed: String,
    #[serde(default = "default_pgn_files_succeeded")]
    pub pgn_files_succeeded: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            games: default_games(),
            games_failed: default_games_failed(),
            games_succeeded: default_games_succeeded(),
            pgn_files_failed: default_pgn_files_failed(),
            pgn_files_succeeded: default_pgn_files_succeeded(),
        }
    }
}

fn default_games() -> String {
    "chessy_games".to_string()
}

fn default_games_failed() -> String {
    "chessy_games_failed".to_string()
}

fn default_games_succeeded() -> String {
    "chessy_games_succeeded".to_string()
}

fn default_pgn_files_failed() -> String {
    "chessy_pgn_files_failed".to_string()
}

fn default_pgn_files_succeeded() -> String {
    "chessy_pgn_files_succeeded".to_string()
}

/// Read a config file and interpolate environment variables in its contents.
///
/// Interpolation errors are accumulated and reported together so the user
/// sees every missing variable at once.
pub fn read_config_file(path: &str) -> Result<String, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile { source })?;
    interpolate_contents(&contents)
}

/// Interpolate environment variables in raw config contents.
pub fn interpolate_contents(contents: &str) -> Result<String, ConfigError> {
    let result = interpolate(contents);
    if result.is_ok() {
        Ok(result.text)
    } else {
        Err(ConfigError::EnvInterpolation {
            message: result.errors.join("\n"),
        })
    }
}
