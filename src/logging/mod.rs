//! Logging infrastructure - structured tracing for preparation and calls
//!
//! Design: `tracing` events at fixed targets, zero-cost when no subscriber
//! is installed:
//! - `cifbind::cif` - descriptor preparation and failures
//! - `cifbind::call` - every invocation (trace)
//! - `cifbind::types` - aggregate registration (trace)
//! - `cifbind::library` - library loads and symbol lookups
//!
//! The library never installs a subscriber on its own. Applications and
//! tests call `init()` (environment driven) or `init_with_config()`.

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer, Registry,
};

/// Set once the first initialization attempt has run
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the background writer flushing for the rest of the process
static WRITER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Log destination
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    /// Daily-rotated files `<directory>/<prefix>.<date>`
    File { directory: PathBuf, prefix: String },
}

impl LogOutput {
    /// File output derived from a single path
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cifbind.log".to_string());
        Self::File { directory, prefix }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level for the `cifbind` targets
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Emit span enter/close events
    pub span_events: bool,
    /// Extra filter directives, comma separated (e.g. "cifbind::call=trace")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay `CIFBIND_LOG_*` values from `lookup` onto the defaults
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::default().overlay(lookup)
    }

    /// Overlay `CIFBIND_LOG_*` values from `lookup` onto `self`
    ///
    /// Unparseable values are ignored.
    pub(crate) fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // CIFBIND_LOG_LEVEL: trace, debug, info, warn, error
        if let Some(level) = lookup("CIFBIND_LOG_LEVEL").and_then(|v| v.trim().parse().ok()) {
            self.level = level;
        }

        // CIFBIND_LOG_FORMAT: pretty, compact, json
        if let Some(format) = lookup("CIFBIND_LOG_FORMAT").and_then(|v| LogFormat::parse(&v)) {
            self.format = format;
        }

        if let Some(path) = lookup("CIFBIND_LOG_FILE").filter(|p| !p.is_empty()) {
            self.output = LogOutput::file(path);
        }

        if let Some(spans) = lookup("CIFBIND_LOG_SPANS") {
            self.span_events = matches!(spans.trim(), "1" | "true" | "yes" | "on");
        }

        self
    }

    /// Verbose config for debugging call marshalling
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            span_events: true,
            filter: None,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("cifbind={}", self.level.as_str().to_lowercase()))
        });

        match &self.filter {
            Some(directives) => directives
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .filter_map(|d| d.parse::<Directive>().ok())
                .fold(base, EnvFilter::add_directive),
            None => base,
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Initialize logging from `CIFBIND_LOG_*` environment variables
///
/// Returns whether this call installed the global subscriber.
pub fn init() -> bool {
    init_with_config(LogConfig::from_env())
}

/// Initialize logging with custom configuration
///
/// Only the first call in a process does anything. If another global
/// subscriber is already installed it is left in place and `false` is
/// returned.
pub fn init_with_config(config: LogConfig) -> bool {
    let mut installed = false;
    LOGGER_INITIALIZED.get_or_init(|| {
        installed = install(&config).is_ok();
    });
    installed
}

fn install(config: &LogConfig) -> Result<(), TryInitError> {
    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(config.span_events())
        .with_target(true)
        .with_thread_ids(cfg!(debug_assertions));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(config.build_filter()))
        .try_init()?;

    *WRITER_GUARD.lock() = Some(guard);
    Ok(())
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(!config.span_events);
        assert_eq!(config.filter, None);

        assert_eq!(LogConfig::debug().level, Level::TRACE);
    }

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_output(LogOutput::Stdout)
            .with_span_events(true)
            .with_filter("cifbind::call=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Stdout);
        assert!(config.span_events);
        assert_eq!(config.filter.as_deref(), Some("cifbind::call=trace"));
    }

    #[test]
    fn test_env_overlay() {
        let config = LogConfig::from_lookup(vars(&[
            ("CIFBIND_LOG_LEVEL", "debug"),
            ("CIFBIND_LOG_FORMAT", "JSON"),
            ("CIFBIND_LOG_FILE", "/var/log/cifbind/calls.log"),
            ("CIFBIND_LOG_SPANS", "1"),
        ]));

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(
            config.output,
            LogOutput::File {
                directory: PathBuf::from("/var/log/cifbind"),
                prefix: "calls.log".to_string(),
            }
        );
        assert!(config.span_events);
    }

    #[test]
    fn test_env_invalid_values_ignored() {
        let config = LogConfig::from_lookup(vars(&[
            ("CIFBIND_LOG_LEVEL", "loud"),
            ("CIFBIND_LOG_FORMAT", "xml"),
            ("CIFBIND_LOG_FILE", ""),
        ]));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_file_output_without_directory() {
        assert_eq!(
            LogOutput::file("trace.log"),
            LogOutput::File {
                directory: PathBuf::from("."),
                prefix: "trace.log".to_string(),
            }
        );
    }

    #[test]
    fn test_init_idempotent() {
        init_with_config(LogConfig::new().with_level(Level::WARN));
        // Second call is a no-op.
        assert!(!init());
        assert!(is_initialized());
    }
}
