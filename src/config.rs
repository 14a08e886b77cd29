//! Runtime configuration
//!
//! Only logging is configurable; the calling convention is fixed per
//! descriptor in code. Files are TOML:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "json"
//! file = "/var/log/app/cifbind.log"
//! spans = false
//! filter = "cifbind::call=trace"
//! ```

use crate::logging::{LogConfig, LogFormat, LogOutput};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

/// Configuration loading and saving errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Log file path; stderr when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    #[serde(default)]
    pub spans: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: None,
            spans: false,
            filter: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults with `CIFBIND_LOG_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log = self.log_config().overlay(&lookup);
        self.logging.level = log.level.as_str().to_lowercase();
        self.logging.format = log.format;
        self.logging.spans = log.span_events;
        if let Some(path) = lookup("CIFBIND_LOG_FILE").filter(|p| !p.is_empty()) {
            self.logging.file = Some(PathBuf::from(path));
        }
        self
    }

    /// Logging configuration described by the `[logging]` section
    ///
    /// An unrecognised level falls back to `info`.
    pub fn log_config(&self) -> LogConfig {
        let logging = &self.logging;
        LogConfig {
            level: logging.level.trim().parse().unwrap_or(Level::INFO),
            format: logging.format,
            output: match &logging.file {
                Some(path) => LogOutput::file(path),
                None => LogOutput::Stderr,
            },
            span_events: logging.spans,
            filter: logging.filter.clone(),
        }
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
