//! Error handling for the ZIGMA access core.
//!
//! This module provides:
//! - A single error type with machine-readable codes and context chaining
//! - HTTP status code mapping for the dashboard API
//! - User-friendly messages vs detailed internal messages
//! - Severity-driven logging through `tracing`
//! - An error counter through `metrics`
//!
//! Authorization denials are not errors. The route guard answers them with a
//! redirect; only explicit API calls (such as a role update attempted by a
//! non-admin) surface `Forbidden`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use zigma_core::error::{ZigmaError, Result, ErrorContext, ErrorCode};
//!
//! fn load_profiles() -> Result<Vec<Profile>> {
//!     let body = read_body().with_error_code(ErrorCode::BackendError)?;
//!     Ok(serde_json::from_str(&body)?)
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for ZIGMA operations.
pub type Result<T> = std::result::Result<T, ZigmaError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication (1000-1099)
    Unauthorized,
    InvalidCredentials,
    SessionExpired,

    // Authorization (1100-1199)
    Forbidden,
    SelfRoleChange,

    // Backend collaborator (2000-2099)
    BackendError,
    BackendUnavailable,
    NetworkError,
    RecordNotFound,

    // Data (3000-3099)
    SerializationError,
    DeserializationError,
    InvalidRole,
    InvalidCapability,
    InvalidInput,

    // Configuration (5000-5099)
    ConfigurationError,
    MissingConfiguration,
    InvalidConfiguration,

    // Internal (9000-9099)
    ResolverShutDown,
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::Unauthorized => 1000,
            Self::InvalidCredentials => 1001,
            Self::SessionExpired => 1002,

            Self::Forbidden => 1100,
            Self::SelfRoleChange => 1101,

            Self::BackendError => 2000,
            Self::BackendUnavailable => 2001,
            Self::NetworkError => 2002,
            Self::RecordNotFound => 2003,

            Self::SerializationError => 3000,
            Self::DeserializationError => 3001,
            Self::InvalidRole => 3002,
            Self::InvalidCapability => 3003,
            Self::InvalidInput => 3004,

            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
            Self::InvalidConfiguration => 5002,

            Self::ResolverShutDown => 9000,
            Self::InternalError => 9001,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials | Self::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }

            Self::Forbidden | Self::SelfRoleChange => StatusCode::FORBIDDEN,

            Self::RecordNotFound => StatusCode::NOT_FOUND,

            Self::InvalidRole | Self::InvalidCapability | Self::InvalidInput => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            Self::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendError | Self::NetworkError => StatusCode::BAD_GATEWAY,

            Self::SerializationError
            | Self::DeserializationError
            | Self::ConfigurationError
            | Self::MissingConfiguration
            | Self::InvalidConfiguration
            | Self::ResolverShutDown
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error is retryable.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable | Self::NetworkError | Self::BackendError
        )
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "authentication",
            1100..=1199 => "authorization",
            2000..=2099 => "backend",
            3000..=3099 => "data",
            5000..=5099 => "configuration",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// User errors (bad credentials, bad input, refused actions)
    Low,
    /// Operational issues (backend hiccups)
    Medium,
    /// System errors (misconfiguration, undecodable backend payloads)
    High,
    /// The access core itself is broken
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::Unauthorized
            | ErrorCode::InvalidCredentials
            | ErrorCode::SessionExpired
            | ErrorCode::Forbidden
            | ErrorCode::SelfRoleChange
            | ErrorCode::RecordNotFound
            | ErrorCode::InvalidRole
            | ErrorCode::InvalidCapability
            | ErrorCode::InvalidInput => Self::Low,

            ErrorCode::BackendError | ErrorCode::BackendUnavailable | ErrorCode::NetworkError => {
                Self::Medium
            }

            ErrorCode::SerializationError
            | ErrorCode::DeserializationError
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration => Self::High,

            ErrorCode::ResolverShutDown | ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for the ZIGMA access core.
#[derive(Error, Debug)]
pub struct ZigmaError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message (safe to expose to clients)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for ZigmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl ZigmaError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An internal error occurred",
            message,
        )
    }

    /// Create a not found error.
    pub fn not_found(entity_type: &str, entity_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} not found: {}", entity_type, entity_id),
        )
    }

    /// Create an unauthorized error (no session).
    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a forbidden error (session present, capability missing).
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a backend error with the backend's own message kept internal.
    pub fn backend(user_message: impl Into<Cow<'static, str>>, internal: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::BackendError, user_message, internal)
    }

    /// The resolver actor is gone (torn down or panicked).
    pub fn resolver_shut_down() -> Self {
        Self::new(
            ErrorCode::ResolverShutDown,
            "The session resolver is not running",
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add internal message.
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the user-friendly message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Get the internal message (if any).
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Low severity error"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            "zigma_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure body of the API envelope.
///
/// Mirrors the success envelope (`success`, `data`) so clients parse one
/// shape. Never carries the internal message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// User-friendly error message
    pub error: String,

    /// Machine-readable code, e.g. `SelfRoleChange`
    pub error_code: String,

    pub numeric_code: u32,
}

impl From<&ZigmaError> for ErrorResponse {
    fn from(error: &ZigmaError) -> Self {
        Self {
            success: false,
            error: error.user_message.to_string(),
            error_code: error.code.to_string(),
            numeric_code: error.code.numeric_code(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for ZigmaError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with error code.
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| ZigmaError::internal(message.into()).with_source(e))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| ZigmaError::new(code, e.to_string()).with_source(e))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| ZigmaError::new(ErrorCode::RecordNotFound, message.into()))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.ok_or_else(|| ZigmaError::new(code, "Resource not found"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<serde_json::Error> for ZigmaError {
    fn from(error: serde_json::Error) -> Self {
        let code = if error.is_syntax() || error.is_data() || error.is_eof() {
            ErrorCode::DeserializationError
        } else {
            ErrorCode::SerializationError
        };

        Self::with_internal(code, "Failed to process JSON data", error.to_string())
            .with_source(error)
    }
}

impl From<reqwest::Error> for ZigmaError {
    fn from(error: reqwest::Error) -> Self {
        let (code, user_msg) = if error.is_timeout() {
            (
                ErrorCode::BackendUnavailable,
                "The authentication service timed out",
            )
        } else if error.is_connect() {
            (
                ErrorCode::NetworkError,
                "Failed to connect to the authentication service",
            )
        } else if error.is_decode() {
            (
                ErrorCode::DeserializationError,
                "The authentication service returned an unexpected payload",
            )
        } else if let Some(status) = error.status() {
            match status.as_u16() {
                401 => (ErrorCode::Unauthorized, "The session is not authorized"),
                403 => (ErrorCode::Forbidden, "The backend refused this operation"),
                404 => (ErrorCode::RecordNotFound, "The requested record was not found"),
                500..=599 => (
                    ErrorCode::BackendUnavailable,
                    "The authentication service is temporarily unavailable",
                ),
                _ => (
                    ErrorCode::BackendError,
                    "The authentication service returned an error",
                ),
            }
        } else {
            (ErrorCode::NetworkError, "Network error occurred")
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for ZigmaError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, user_msg) = match error.kind() {
            ErrorKind::NotFound => (ErrorCode::RecordNotFound, "File or resource not found"),
            ErrorKind::PermissionDenied => (ErrorCode::Forbidden, "Permission denied"),
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
                (ErrorCode::NetworkError, "Connection failed")
            }
            _ => (ErrorCode::InternalError, "An I/O error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<config::ConfigError> for ZigmaError {
    fn from(error: config::ConfigError) -> Self {
        let (code, user_msg) = match &error {
            config::ConfigError::NotFound(_) => (
                ErrorCode::MissingConfiguration,
                "Required configuration not found",
            ),
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => (
                ErrorCode::InvalidConfiguration,
                "Configuration file is invalid",
            ),
            _ => (
                ErrorCode::ConfigurationError,
                "Configuration error occurred",
            ),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
