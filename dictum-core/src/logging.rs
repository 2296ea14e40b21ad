//! Logging configuration for the introspection core.
//!
//! The pipeline issues dozens of small catalog queries per table; per-query
//! logging is therefore opt-in, and generated SQL is truncated before it is
//! attached to a span field.

use tracing::Level;

/// Logging configuration presets.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for core components
    pub base_level: Level,
    /// Whether to log every generated statement before execution
    pub log_statements: bool,
    /// Whether to use JSON output format
    pub json_format: bool,
    /// Maximum length for logged SQL/field values
    pub max_field_length: usize,
    /// Environment filter override (falls back to `RUST_LOG`)
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_statements: false,
            json_format: false,
            max_field_length: 256,
            env_filter: None,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_statements: true,
            json_format: false,
            max_field_length: 1024,
            env_filter: None,
        }
    }

    /// Creates a minimal JSON configuration for production.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_statements: false,
            json_format: true,
            max_field_length: 128,
            env_filter: None,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Sets a custom environment filter.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn filter_directive(&self) -> String {
        if let Some(ref filter) = self.env_filter {
            filter.clone()
        } else {
            let level = self.base_level.as_str().to_lowercase();
            format!("{level},dictum_core={level}")
        }
    }

    /// Installs a global subscriber for this configuration.
    ///
    /// `RUST_LOG` takes precedence over the preset level when set.
    pub fn init(&self) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.filter_directive()));

        let fmt_layer = if self.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(max_length).collect();
        format!("{truncated}...(truncated)")
    }
}
