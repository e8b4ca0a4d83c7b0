//! Observability configuration: log output and the metrics exporter.

use serde::{Deserialize, Serialize};

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus exporter port; no exporter when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Line encoding.
    #[serde(default)]
    pub format: LogFormat,
    /// Attach the current span and span list to JSON lines.
    #[serde(default = "default_include_spans")]
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            include_spans: default_include_spans(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_include_spans() -> bool {
    true
}
