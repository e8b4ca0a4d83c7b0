//! Configuration module for the order coordinator.
//!
//! Loads a YAML file with environment variable interpolation and validates
//! it. Every section is optional and falls back to defaults.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_coordinator::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! println!("poll interval: {}ms", config.coordinator.poll_interval_ms);
//! ```

mod coordinator;
mod observability;
mod paper;

use std::io::ErrorKind;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use coordinator::{CoordinatorConfig, FatalPolicy, ReplyRouting};
pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use paper::{PaperConfig, PaperSymbolConfig};

/// Default configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Environment variable naming the configuration path.
pub const CONFIG_PATH_ENV: &str = "ORDER_COORDINATOR_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Coordinator configuration.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Paper venue configuration.
    #[serde(default)]
    pub paper: PaperConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Like [`load_config`], but a missing file yields the defaults.
///
/// # Errors
///
/// Returns a `ConfigError` if an existing file cannot be read, parsed, or
/// validated.
pub fn load_config_or_default(path: Option<&str>) -> Result<Config, ConfigError> {
    match load_config(path) {
        Err(ConfigError::ReadError { path, source }) if source.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path, "Config file not found, using defaults");
            let config = Config::default();
            validate_config(&config)?;
            Ok(config)
        }
        other => other,
    }
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let coordinator = &config.coordinator;

    if coordinator.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "coordinator.poll_interval_ms must be positive".to_string(),
        ));
    }

    if coordinator.progress_log_secs == 0 {
        return Err(ConfigError::ValidationError(
            "coordinator.progress_log_secs must be positive".to_string(),
        ));
    }

    if coordinator.reduction_factor <= Decimal::ZERO || coordinator.reduction_factor >= Decimal::ONE
    {
        return Err(ConfigError::ValidationError(
            "coordinator.reduction_factor must be between 0 and 1 (exclusive)".to_string(),
        ));
    }

    if coordinator.min_quantity == 0 {
        return Err(ConfigError::ValidationError(
            "coordinator.min_quantity must be positive".to_string(),
        ));
    }

    if coordinator.max_concurrent_watchers == Some(0) {
        return Err(ConfigError::ValidationError(
            "coordinator.max_concurrent_watchers must be positive when set".to_string(),
        ));
    }

    if config.observability.logging.level.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "observability.logging.level must not be empty".to_string(),
        ));
    }

    if config.paper.balance < Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "paper.balance must not be negative".to_string(),
        ));
    }

    for (symbol, data) in &config.paper.symbols {
        let prices = [Some(data.bid), Some(data.ask), data.last, data.mark, data.index];
        if prices.iter().flatten().any(|p| *p < Decimal::ZERO) || data.stop_offset < Decimal::ZERO
        {
            return Err(ConfigError::ValidationError(format!(
                "paper.symbols.{symbol}: prices and stop_offset must not be negative"
            )));
        }
        if data.bid > data.ask {
            return Err(ConfigError::ValidationError(format!(
                "paper.symbols.{symbol}: bid must not exceed ask"
            )));
        }
    }

    Ok(())
}
