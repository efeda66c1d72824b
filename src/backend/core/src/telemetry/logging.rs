//! Structured logging with JSON/pretty formats and credential redaction.
//!
//! - JSON format for deployed servers
//! - Pretty format for local development
//! - Per-module log level configuration
//! - Redaction of bearer tokens and passwords that backend error bodies may echo

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Global redactor instance for sensitive data.
static REDACTOR: OnceLock<SensitiveFieldRedactor> = OnceLock::new();

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty or compact)
    #[serde(default)]
    pub format: LogFormat,

    /// Per-module log levels
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// Whether to include file/line information
    #[serde(default = "default_include_location")]
    pub include_location: bool,

    /// Whether to include target (module path)
    #[serde(default = "default_include_target")]
    pub include_target: bool,

    /// Whether credential redaction is applied to logged backend payloads
    #[serde(default = "default_redaction_enabled")]
    pub redact: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: HashMap::new(),
            include_location: default_include_location(),
            include_target: default_include_target(),
            redact: default_redaction_enabled(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production/structured logging
    #[default]
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Redactor for credentials in log output.
#[derive(Debug, Clone)]
pub struct SensitiveFieldRedactor {
    value_patterns: Vec<regex::Regex>,
    replacement: &'static str,
    enabled: bool,
}

impl SensitiveFieldRedactor {
    /// Create a redactor; a disabled redactor passes everything through.
    pub fn new(enabled: bool) -> Self {
        let value_patterns = [
            // JWT access tokens
            r"eyJ[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+",
            // "password":"..." inside echoed request bodies
            r#""password"\s*:\s*"[^"]*""#,
        ]
        .iter()
        .filter_map(|pat| regex::Regex::new(pat).ok())
        .collect();

        Self {
            value_patterns,
            replacement: "[REDACTED]",
            enabled,
        }
    }

    /// Redact a value if it matches any pattern.
    pub fn redact_value(&self, value: &str) -> String {
        if !self.enabled {
            return value.to_string();
        }

        let mut result = value.to_string();
        for regex in &self.value_patterns {
            result = regex.replace_all(&result, self.replacement).to_string();
        }
        result
    }

    /// Get the global redactor instance.
    pub fn global() -> &'static SensitiveFieldRedactor {
        REDACTOR.get_or_init(|| SensitiveFieldRedactor::new(true))
    }
}

// Default value functions
fn default_log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn default_include_location() -> bool {
    true
}

fn default_include_target() -> bool {
    true
}

fn default_redaction_enabled() -> bool {
    true
}

/// Initialize the logging subsystem.
///
/// # Errors
///
/// Returns an error if a level directive does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let _ = REDACTOR.set(SensitiveFieldRedactor::new(config.redact));

    let mut filter = EnvFilter::try_new(&config.level)?;
    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(directive.parse()?);
    }

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}
