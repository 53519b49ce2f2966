//! Configuration for the query API.

use serde::{Deserialize, Serialize};

use chessy_common::config::{TableNames, read_config_file};
use chessy_common::error::ConfigError;

/// Main configuration for the query API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_address")]
    pub address: String,
    pub store: StoreConfig,
}

/// Location of the record store the API reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Location backing the record store (S3 URL or local path).
    pub path: String,
    /// Logical table names.
    #[serde(default)]
    pub tables: TableNames,
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl ApiConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = read_config_file(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from interpolated YAML contents.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: ApiConfig =
            serde_yaml::from_str(contents).map_err(|source| ConfigError::YamlParse { source })?;
        if config.store.path.is_empty() {
            return Err(ConfigError::EmptyStorePath);
        }
        Ok(config)
    }
}
