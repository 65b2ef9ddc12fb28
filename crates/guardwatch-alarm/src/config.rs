//! Configuration for the alarm handler

use guardwatch_bedrock::ModelSettings;
use guardwatch_core::{FETCH_LIMIT, FETCH_WINDOW_MINUTES, LOG_GROUP, LOG_STREAM, QUERY_TIMEOUT_SECONDS};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "GUARDWATCH_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

// Main config structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlarmConfig {
    // optional override of the built-in prompt template
    #[serde(default)]
    pub prompt_template: Option<PathBuf>,

    #[serde(default)]
    pub logs: LogSourceConfig,

    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub aws: AwsSettings,
}

// where invocation logs are read from
#[derive(Debug, Clone, Deserialize)]
pub struct LogSourceConfig {
    #[serde(default = "default_log_group")]
    pub log_group: String,

    #[serde(default = "default_log_stream")]
    pub log_stream: String,

    // half-width of the window around the alarm time
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,

    // max events per query
    #[serde(default = "default_limit")]
    pub limit: i32,

    #[serde(default = "default_query_timeout")]
    pub query_timeout_seconds: u64,
}

impl Default for LogSourceConfig {
    fn default() -> Self {
        Self {
            log_group: default_log_group(),
            log_stream: default_log_stream(),
            window_minutes: default_window_minutes(),
            limit: default_limit(),
            query_timeout_seconds: default_query_timeout(),
        }
    }
}

impl LogSourceConfig {
    pub fn window_half_width(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_minutes)
    }

    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.query_timeout_seconds)
    }
}

// credentials profile and region; unset means the default provider chain
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsSettings {
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub region: Option<String>,
}

// default value helpers for serde
fn default_log_group() -> String {
    LOG_GROUP.to_string()
}

fn default_log_stream() -> String {
    LOG_STREAM.to_string()
}

fn default_window_minutes() -> i64 {
    FETCH_WINDOW_MINUTES
}

fn default_limit() -> i32 {
    FETCH_LIMIT
}

fn default_query_timeout() -> u64 {
    QUERY_TIMEOUT_SECONDS
}

// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AlarmConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: AlarmConfig = toml::from_str(&content)?;
    Ok(config)
}

impl AlarmConfig {
    /// Load from the file named by `GUARDWATCH_CONFIG`, or use defaults when unset
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_optional(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    pub fn load_optional(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => load_config(path),
            None => Ok(Self::default()),
        }
    }
}
