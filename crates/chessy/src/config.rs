//! Configuration for the ingestion pipeline.
//!
//! Loaded once at process start from YAML (with environment variable
//! interpolation) and threaded into each component. Queue endpoints,
//! table names, and tuning knobs are never hard-coded in component logic.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use chessy_common::config::{MetricsConfig, TableNames, read_config_file};
use chessy_common::error::ConfigError;

use crate::queue::{DEFAULT_MAX_RECEIVE_COUNT, WorkQueueConfig};

/// Configuration for the archive source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Location of uploaded archives (S3 URL or local path).
    pub path: String,
    /// How often to poll for newly uploaded archives.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    60
}

/// Configuration for the splitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Games per chunk task. Small enough that one chunk's processing
    /// stays well under the visibility timeout.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    1
}

/// Configuration for the work queue and its dead-letter queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Lease duration for received tasks.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: u64,
    /// Redeliveries allowed beyond the first delivery.
    #[serde(default = "default_max_receive_count")]
    pub max_receive_count: u32,
    /// How often the dead-letter handler drains its queue.
    #[serde(default = "default_dlq_poll_interval")]
    pub dlq_poll_interval_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: default_visibility_timeout(),
            max_receive_count: default_max_receive_count(),
            dlq_poll_interval_secs: default_dlq_poll_interval(),
        }
    }
}

fn default_visibility_timeout() -> u64 {
    120
}

fn default_max_receive_count() -> u32 {
    DEFAULT_MAX_RECEIVE_COUNT
}

fn default_dlq_poll_interval() -> u64 {
    10
}

impl QueueSettings {
    pub fn to_queue_config(&self) -> WorkQueueConfig {
        WorkQueueConfig {
            visibility_timeout: Duration::from_secs(self.visibility_timeout_secs),
            max_receive_count: self.max_receive_count,
        }
    }
}

/// Configuration for the record store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Location backing the record store (S3 URL or local path).
    pub path: String,
    /// Logical table names.
    #[serde(default)]
    pub tables: TableNames,
}

/// Main configuration for the chessy pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub splitter: SplitterConfig,
    #[serde(default)]
    pub queue: QueueSettings,
    /// Parser worker slots; each processes one chunk task at a time.
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_workers() -> usize {
    4
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = read_config_file(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from interpolated YAML contents.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml::from_str(contents).map_err(|source| ConfigError::YamlParse { source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source.path.is_empty() {
            return Err(ConfigError::EmptySourcePath);
        }
        if self.store.path.is_empty() {
            return Err(ConfigError::EmptyStorePath);
        }
        if self.splitter.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        let yaml = r#"
source:
  path: "./archives"
store:
  path: "./records"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.source.poll_interval_secs, 60);
        assert_eq!(config.splitter.chunk_size, 1);
        assert_eq!(config.queue.visibility_timeout_secs, 120);
        assert_eq!(config.queue.max_receive_count, 2);
        assert_eq!(config.workers, 4);
        assert_eq!(config.store.tables.games, "chessy_games");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
source:
  path: "s3://chessy-pgn-files"
  poll_interval_secs: 15
splitter:
  chunk_size: 50
queue:
  visibility_timeout_secs: 30
  max_receive_count: 1
workers: 8
store:
  path: "s3://chessy-records"
  tables:
    games: "games_v2"
metrics:
  address: "127.0.0.1:9100"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.splitter.chunk_size, 50);
        assert_eq!(config.queue.max_receive_count, 1);
        assert_eq!(config.store.tables.games, "games_v2");
        assert_eq!(config.store.tables.games_failed, "chessy_games_failed");
        assert_eq!(config.metrics.address, "127.0.0.1:9100");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let yaml = r#"
source:
  path: "./archives"
splitter:
  chunk_size: 0
store:
  path: "./records"
"#;
        assert!(matches!(
            Config::parse(yaml),
            Err(ConfigError::ZeroChunkSize)
        ));
    }

    #[test]
    fn test_empty_source_path_rejected() {
        let yaml = r#"
source:
  path: ""
store:
  path: "./records"
"#;
        assert!(matches!(
            Config::parse(yaml),
            Err(ConfigError::EmptySourcePath)
        ));
    }
}
