//! Error types for erpdash-core
//!
//! This module provides error handling for the data-shaping core and the
//! upstream boundary, including error codes, detailed messages, and
//! suggestions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Record without a usable id
    MalformedInput,
    /// Same id appears twice
    DuplicateId,
    /// Parent links form a cycle
    CycleDetected,
    /// Parent link points at a missing record
    OrphanParent,
    /// Record does not match its schema
    DecodeError,
    /// Input rejected before sending
    ValidationError,
    /// Bad filter, sort or page parameter
    InvalidQuery,
    /// Upstream could not be reached
    NetworkError,
    /// Upstream answered with an error status
    ApiError,
    /// Resource not found
    NotFound,
    /// Request cancelled before completion
    Cancelled,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::MalformedInput => write!(f, "MALFORMED_INPUT"),
            ErrorCode::DuplicateId => write!(f, "DUPLICATE_ID"),
            ErrorCode::CycleDetected => write!(f, "CYCLE_DETECTED"),
            ErrorCode::OrphanParent => write!(f, "ORPHAN_PARENT"),
            ErrorCode::DecodeError => write!(f, "DECODE_ERROR"),
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::InvalidQuery => write!(f, "INVALID_QUERY"),
            ErrorCode::NetworkError => write!(f, "NETWORK_ERROR"),
            ErrorCode::ApiError => write!(f, "API_ERROR"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::Cancelled => write!(f, "CANCELLED"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - operation may be affected
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - application may be unstable
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for erpdash-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Malformed record at index {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    #[error("Duplicate id: {id}")]
    DuplicateId { id: String },

    #[error("Cyclic parent reference involving id {id}")]
    CycleDetected { id: String },

    #[error("Record {id} references missing parent {parent}")]
    OrphanParent { id: String, parent: String },

    #[error("Could not decode {schema}: {message}")]
    Decode { schema: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid query parameter '{param}': {reason}")]
    InvalidQuery { param: String, reason: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::MalformedInput { .. } => ErrorCode::MalformedInput,
            CoreError::DuplicateId { .. } => ErrorCode::DuplicateId,
            CoreError::CycleDetected { .. } => ErrorCode::CycleDetected,
            CoreError::OrphanParent { .. } => ErrorCode::OrphanParent,
            CoreError::Decode { .. } => ErrorCode::DecodeError,
            CoreError::Validation { .. } => ErrorCode::ValidationError,
            CoreError::InvalidQuery { .. } => ErrorCode::InvalidQuery,
            CoreError::Network { .. } => ErrorCode::NetworkError,
            CoreError::Api { .. } => ErrorCode::ApiError,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::Cancelled => ErrorCode::Cancelled,
            CoreError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Cancelled => ErrorSeverity::Info,
            CoreError::NotFound { .. } => ErrorSeverity::Info,
            CoreError::Validation { .. } => ErrorSeverity::Warning,
            CoreError::InvalidQuery { .. } => ErrorSeverity::Warning,
            CoreError::OrphanParent { .. } => ErrorSeverity::Warning,
            CoreError::Api { status, .. } if *status < 500 => ErrorSeverity::Warning,
            CoreError::Internal { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::DuplicateId { id } => {
                details = details.with_detail(serde_json::json!({ "id": id }));
                details = details.with_suggestion(
                    "Each record must have a unique id; check the upstream data.".to_string(),
                );
            }
            CoreError::CycleDetected { id } => {
                details = details.with_detail(serde_json::json!({ "id": id }));
                details = details.with_suggestion(format!(
                    "Fix the parent reference chain that passes through {}.",
                    id
                ));
            }
            CoreError::OrphanParent { id, parent } => {
                details = details.with_detail(serde_json::json!({ "id": id, "parent": parent }));
                details = details.with_suggestion(
                    "Load the parent record too, or build the tree with the root orphan policy.".to_string(),
                );
            }
            CoreError::Decode { schema, .. } => {
                details = details.with_suggestion(format!(
                    "The upstream response did not match the expected {} shape.",
                    schema
                ));
            }
            CoreError::Api { status, .. } => {
                details = details.with_detail(serde_json::json!({ "status": status }));
            }
            CoreError::Network { .. } => {
                details = details.with_suggestion(
                    "Check that upstream.base_url is reachable from the dashboard host.".to_string(),
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Operation being performed
    pub operation: String,
    /// Page the operation belongs to
    pub page: Option<String>,
    /// Request sequence number, when the operation is a tracked fetch
    pub sequence: Option<u64>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            page: None,
            sequence: None,
        }
    }

    /// Attach the owning page
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Attach the request sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// Error logger trait
pub trait ErrorLogger {
    /// Log an error
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    /// Log a warning
    fn log_warning(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        match error.severity() {
            ErrorSeverity::Info => log::info!(
                target: "erpdash::error",
                "[{}] {} - Operation: {} - Page: {:?} - Seq: {:?}",
                error.code(),
                error,
                context.operation,
                context.page,
                context.sequence
            ),
            ErrorSeverity::Warning => log::warn!(
                target: "erpdash::error",
                "[{}] {} - Operation: {} - Page: {:?} - Seq: {:?}",
                error.code(),
                error,
                context.operation,
                context.page,
                context.sequence
            ),
            _ => log::error!(
                target: "erpdash::error",
                "[{}] {} - Operation: {} - Page: {:?} - Seq: {:?}",
                error.code(),
                error.to_details(),
                context.operation,
                context.page,
                context.sequence
            ),
        }
    }

    fn log_warning(&self, message: &str, context: &ErrorContext) {
        log::warn!(
            target: "erpdash::error",
            "WARNING: {} - Operation: {} - Page: {:?} - Seq: {:?}",
            message,
            context.operation,
            context.page,
            context.sequence
        );
    }
}

// ==================== Tests ====================
