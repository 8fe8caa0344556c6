use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every key maps to an environment variable of the same name in upper case
/// (`mongo_uri` <- `MONGO_URI`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Connection string of the document store. Required to start serving.
    #[serde(default)]
    pub mongo_uri: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name; falls back to the database in the URI, then `test`.
    #[serde(default)]
    pub mongo_db_name: Option<String>,
    #[serde(default = "default_collection")]
    pub mongo_collection: String,
    #[serde(default = "default_connect_retries")]
    pub mongo_connect_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub mongo_retry_delay_ms: u64,
    #[serde(default = "default_server_selection_timeout_ms")]
    pub mongo_server_selection_timeout_ms: u64,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_collection() -> String { "reportdatas".to_string() }
fn default_connect_retries() -> u32 { 6 }
fn default_retry_delay_ms() -> u64 { 5000 }
fn default_server_selection_timeout_ms() -> u64 { 5000 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            mongo_uri: None,
            host: default_host(),
            port: default_port(),
            mongo_db_name: None,
            mongo_collection: default_collection(),
            mongo_connect_retries: default_connect_retries(),
            mongo_retry_delay_ms: default_retry_delay_ms(),
            mongo_server_selection_timeout_ms: default_server_selection_timeout_ms(),
            log_dir: None,
        }
    }
}

impl Settings {
    /// Returns the store connection string, treating an empty value as unset.
    pub fn require_mongo_uri(&self) -> Result<&str, ConfigError> {
        match self.mongo_uri.as_deref() {
            Some(uri) if !uri.trim().is_empty() => Ok(uri),
            _ => Err(ConfigError::MissingMongoUri),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.mongo_retry_delay_ms)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.mongo_server_selection_timeout_ms)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.mongo_connect_retries == 0 {
            return Err(ConfigError::ValidationError(
                "mongo_connect_retries must be at least 1".to_string(),
            ));
        }
        if self.mongo_collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "mongo_collection must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
