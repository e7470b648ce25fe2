//! Error handling for learnlog.
//!
//! This module provides:
//! - A single error type carrying a machine-readable code and chained sources
//! - A coarse [`ErrorKind`] taxonomy (validation, rejected, transport, not found)
//! - Retryability and severity classification per code
//! - Error logging with tracing integration and an error counter
//!
//! # Usage
//!
//! ```rust,ignore
//! use learnlog_core::error::{LearnlogError, Result, ErrorKind};
//!
//! match store.get_by_id(&id, &ctx).await {
//!     Err(e) if e.kind() == ErrorKind::NotFound => { /* ... */ }
//!     other => other?,
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for learnlog operations.
pub type Result<T> = std::result::Result<T, LearnlogError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Kinds
// ═══════════════════════════════════════════════════════════════════════════════

/// Coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed statement caught before it left the process.
    Validation,
    /// The store refused a structurally checked statement.
    Rejected,
    /// Network, auth, timeout, deadline or cancellation failure.
    Transport,
    /// Lookup by id with no match.
    NotFound,
    /// Serialization, configuration and programming errors.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Rejected => "rejected",
            Self::Transport => "transport",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be used by callers for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation Errors (1000-1099)
    ValidationError,
    MissingRequiredField,
    InvalidInput,

    // Store Rejections (1100-1199)
    StatementRejected,
    StatementConflict,

    // Lookup Errors (1200-1299)
    StatementNotFound,

    // Transport Errors (3000-3099)
    NetworkError,
    Unauthorized,
    RequestTimeout,
    DeadlineExceeded,
    Cancelled,
    RateLimited,
    StoreUnavailable,
    InvalidResponse,

    // Serialization Errors (2200-2299)
    SerializationError,
    DeserializationError,

    // Configuration Errors (5000-5099)
    ConfigurationError,
    MissingConfiguration,
    InvalidConfiguration,

    // Internal Errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::ValidationError => 1000,
            Self::MissingRequiredField => 1001,
            Self::InvalidInput => 1002,

            Self::StatementRejected => 1100,
            Self::StatementConflict => 1101,

            Self::StatementNotFound => 1200,

            Self::SerializationError => 2200,
            Self::DeserializationError => 2201,

            Self::NetworkError => 3000,
            Self::Unauthorized => 3001,
            Self::RequestTimeout => 3002,
            Self::DeadlineExceeded => 3003,
            Self::Cancelled => 3004,
            Self::RateLimited => 3005,
            Self::StoreUnavailable => 3006,
            Self::InvalidResponse => 3007,

            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
            Self::InvalidConfiguration => 5002,

            Self::InternalError => 9000,
        }
    }

    /// Map this code onto the caller-facing failure class.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError | Self::MissingRequiredField | Self::InvalidInput => {
                ErrorKind::Validation
            }

            Self::StatementRejected | Self::StatementConflict => ErrorKind::Rejected,

            Self::StatementNotFound => ErrorKind::NotFound,

            Self::NetworkError
            | Self::Unauthorized
            | Self::RequestTimeout
            | Self::DeadlineExceeded
            | Self::Cancelled
            | Self::RateLimited
            | Self::StoreUnavailable
            | Self::InvalidResponse => ErrorKind::Transport,

            Self::SerializationError
            | Self::DeserializationError
            | Self::ConfigurationError
            | Self::MissingConfiguration
            | Self::InvalidConfiguration
            | Self::InternalError => ErrorKind::Internal,
        }
    }

    /// Check if a caller could reasonably retry after this error.
    ///
    /// Nothing in this crate retries on its own.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError
                | Self::RequestTimeout
                | Self::DeadlineExceeded
                | Self::RateLimited
                | Self::StoreUnavailable
        )
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "validation",
            1100..=1199 => "rejected",
            1200..=1299 => "lookup",
            2200..=2299 => "serialization",
            3000..=3099 => "transport",
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
    /// Caller errors (bad input, missing statement)
    Low,
    /// Operational issues (timeouts, rate limits, cancellation)
    Medium,
    /// Store or integration failures
    High,
    /// Broken invariants inside this crate
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::ValidationError
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidInput
            | ErrorCode::StatementNotFound
            | ErrorCode::StatementRejected
            | ErrorCode::StatementConflict => Self::Low,

            ErrorCode::RequestTimeout
            | ErrorCode::DeadlineExceeded
            | ErrorCode::Cancelled
            | ErrorCode::RateLimited => Self::Medium,

            ErrorCode::NetworkError
            | ErrorCode::Unauthorized
            | ErrorCode::StoreUnavailable
            | ErrorCode::InvalidResponse
            | ErrorCode::SerializationError
            | ErrorCode::DeserializationError
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration => Self::High,

            ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Related entity ID (statement id, project id, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Offending field for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// HTTP status reported by the store, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Retry information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_secs = Some(seconds);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for learnlog.
///
/// Carries a structured [`ErrorCode`], a caller-safe message, an optional
/// internal message for logs, and the source error chain.
#[derive(Error, Debug)]
pub struct LearnlogError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message (safe to surface to callers)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for LearnlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl LearnlogError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
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

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An internal error occurred",
            message,
        )
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// A required statement field is absent or empty.
    pub fn missing_field(field: &'static str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Statement is missing required field `{}`", field),
        )
        .with_details(ErrorDetails::new().with_field(field))
    }

    /// Caller supplied a value outside the accepted set.
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message.into())
            .with_details(ErrorDetails::new().with_field(field))
    }

    /// The store refused the statement(s).
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StatementRejected, message.into())
    }

    /// No statement with the given id.
    pub fn statement_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(
            ErrorCode::StatementNotFound,
            format!("Statement not found: {}", id),
        )
        .with_details(ErrorDetails::new().with_entity("statement", id))
    }

    /// A generic transport failure.
    pub fn transport(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        debug_assert!(matches!(code.kind(), ErrorKind::Transport));
        Self::new(code, message)
    }

    /// The caller's deadline passed before the store answered.
    pub fn deadline_exceeded(operation: &'static str) -> Self {
        Self::new(
            ErrorCode::DeadlineExceeded,
            format!("Deadline exceeded during {}", operation),
        )
        .with_context("operation", operation)
    }

    /// The caller cancelled the call.
    pub fn cancelled(operation: &'static str) -> Self {
        Self::new(
            ErrorCode::Cancelled,
            format!("{} was cancelled", operation),
        )
        .with_context("operation", operation)
    }

    /// Create a configuration error.
    pub fn configuration(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message.into())
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

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the coarse failure class.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Get the user-friendly message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Get the internal message (if any).
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Get the error details.
    pub fn details(&self) -> &ErrorDetails {
        &self.details
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
        let kind = self.kind();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    kind = %kind,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    details = ?self.details,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    kind = %kind,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    kind = %kind,
                    user_message = %self.user_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    kind = %kind,
                    user_message = %self.user_message,
                    "Low severity error"
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    fn record_metrics(&self) {
        counter!(
            crate::telemetry::metrics::ERRORS_TOTAL,
            "code" => self.code.to_string(),
            "kind" => self.code.kind().to_string(),
            "retryable" => self.is_retryable().to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<serde_json::Error> for LearnlogError {
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

impl From<reqwest::Error> for LearnlogError {
    fn from(error: reqwest::Error) -> Self {
        let (code, user_msg) = if error.is_timeout() {
            (ErrorCode::RequestTimeout, "Statement store request timed out")
        } else if error.is_connect() {
            (ErrorCode::NetworkError, "Failed to connect to statement store")
        } else if error.is_decode() {
            (
                ErrorCode::InvalidResponse,
                "Statement store returned an unreadable response",
            )
        } else if let Some(status) = error.status() {
            match status.as_u16() {
                401 | 403 => (
                    ErrorCode::Unauthorized,
                    "Authentication failed with statement store",
                ),
                429 => (ErrorCode::RateLimited, "Rate limited by statement store"),
                500..=599 => (
                    ErrorCode::StoreUnavailable,
                    "Statement store is temporarily unavailable",
                ),
                _ => (ErrorCode::NetworkError, "Statement store returned an error"),
            }
        } else {
            (ErrorCode::NetworkError, "Network error occurred")
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<tokio::time::error::Elapsed> for LearnlogError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self::with_internal(
            ErrorCode::DeadlineExceeded,
            "Operation timed out",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<anyhow::Error> for LearnlogError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<LearnlogError>() {
            Ok(learnlog_error) => learnlog_error,
            Err(error) => Self::with_internal(
                ErrorCode::InternalError,
                "An internal error occurred",
                error.to_string(),
            ),
        }
    }
}

impl From<config::ConfigError> for LearnlogError {
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
            _ => (ErrorCode::ConfigurationError, "Configuration error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_kind() {
        assert_eq!(ErrorCode::MissingRequiredField.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::StatementRejected.kind(), ErrorKind::Rejected);
        assert_eq!(ErrorCode::DeadlineExceeded.kind(), ErrorKind::Transport);
        assert_eq!(ErrorCode::Unauthorized.kind(), ErrorKind::Transport);
        assert_eq!(ErrorCode::StatementNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::InvalidConfiguration.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_code_is_retryable() {
        assert!(ErrorCode::RateLimited.is_retryable());
        assert!(ErrorCode::StoreUnavailable.is_retryable());
        assert!(!ErrorCode::StatementRejected.is_retryable());
        assert!(!ErrorCode::Unauthorized.is_retryable());
        assert!(!ErrorCode::Cancelled.is_retryable());
    }

    #[test]
    fn test_missing_field_details() {
        let error = LearnlogError::missing_field("verb.id");
        assert_eq!(error.code(), ErrorCode::MissingRequiredField);
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.details().field.as_deref(), Some("verb.id"));
    }

    #[test]
    fn test_statement_not_found() {
        let error = LearnlogError::statement_not_found("abc");
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.details().entity_id.as_deref(), Some("abc"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_context() {
        let error = LearnlogError::new(ErrorCode::ValidationError, "Invalid input")
            .with_context("field", "stage")
            .with_context("reason", "unknown stage");

        assert!(error.details().context.contains_key("field"));
        assert!(error.details().context.contains_key("reason"));
    }

    #[test]
    fn test_log_at_every_severity() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            for code in [
                ErrorCode::MissingRequiredField,
                ErrorCode::DeadlineExceeded,
                ErrorCode::NetworkError,
                ErrorCode::InternalError,
            ] {
                let error = LearnlogError::with_internal(code, "failed", "HTTP 500: boom")
                    .with_context("operation", "append");
                error.log();
                assert_eq!(error.internal_message(), Some("HTTP 500: boom"));
            }
        });
    }

    #[test]
    fn test_error_severity() {
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::MissingRequiredField),
            ErrorSeverity::Low
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::DeadlineExceeded),
            ErrorSeverity::Medium
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::NetworkError),
            ErrorSeverity::High
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::InternalError),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_code() {
        let original = LearnlogError::rejected("bad shape");
        let wrapped: anyhow::Error = original.into();
        let back: LearnlogError = wrapped.into();
        assert_eq!(back.code(), ErrorCode::StatementRejected);
    }

    #[test]
    fn test_error_display() {
        let error = LearnlogError::with_internal(
            ErrorCode::NetworkError,
            "Failed to connect to statement store",
            "Connection refused: localhost:8080",
        );

        let display = format!("{}", error);
        assert!(display.contains("NetworkError"));
        assert!(display.contains("Failed to connect"));
        assert!(display.contains("Connection refused"));
    }
}
