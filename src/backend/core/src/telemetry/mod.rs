//! Telemetry: structured logging and Prometheus counters.
//!
//! # Example
//!
//! ```rust,no_run
//! use zigma_core::telemetry::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig, SensitiveFieldRedactor};
pub use metrics::install_recorder;
