//! # Error Taxonomy
//!
//! The closed error taxonomy shared by every layer of the terminal.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Failure Classification                            │
//! │                                                                         │
//! │  Raw failure                    Classified as                           │
//! │  ─────────────────────────────  ─────────────────────────────────────   │
//! │  No connectivity / timeout   →  OFFLINE          (retryable)            │
//! │  HTTP 401                    →  AUTH_ERROR       (terminal for the op)  │
//! │  HTTP 403                    →  PERMISSION_ERROR (terminal for the op)  │
//! │  HTTP 404                    →  NOT_FOUND        (terminal for the op)  │
//! │  HTTP 400/422, bad payload   →  VALIDATION_ERROR (NEVER retried)        │
//! │  HTTP 5xx                    →  API_ERROR        (retryable)            │
//! │  Anything else               →  UNKNOWN_ERROR    (retryable)            │
//! │                                                                         │
//! │  Consumers: RetryExecutor (retry eligibility), the offline queue        │
//! │  (attempt accounting), the error log, and the operator-facing UI.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Classification is pure and total: every input maps to exactly one code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result alias used across the workspace.
pub type PosResult<T> = Result<T, PosError>;

// =============================================================================
// Error Code
// =============================================================================

/// The closed failure taxonomy.
///
/// Exactly one code per failure; no layer invents codes of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No connectivity detected.
    Offline,
    /// Remote rejected our credentials.
    AuthError,
    /// Remote rejected access to the resource.
    PermissionError,
    /// Remote resource absent.
    NotFound,
    /// Caller-supplied data malformed. Never retried.
    ValidationError,
    /// Remote returned a server-side failure.
    ApiError,
    /// Unclassified.
    UnknownError,
}

impl ErrorCode {
    /// Classifies an HTTP status code. Pure and total.
    pub const fn from_status(status: u16) -> ErrorCode {
        match status {
            401 => ErrorCode::AuthError,
            403 => ErrorCode::PermissionError,
            404 => ErrorCode::NotFound,
            400 | 422 => ErrorCode::ValidationError,
            500..=599 => ErrorCode::ApiError,
            _ => ErrorCode::UnknownError,
        }
    }

    /// True if a retry of the same operation may succeed.
    ///
    /// ## Retry Policy
    /// - `Offline`, `ApiError`, `UnknownError`: transient, retried with backoff
    /// - `AuthError`, `PermissionError`, `NotFound`: terminal for the
    ///   in-flight operation (the offline queue still re-attempts across
    ///   drains up to its cap, since the condition may clear)
    /// - `ValidationError`: retrying a malformed request is never productive
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::Offline | ErrorCode::ApiError | ErrorCode::UnknownError
        )
    }

    /// Whether the UI should offer the operator a "retry" action.
    pub const fn invites_retry(&self) -> bool {
        !matches!(self, ErrorCode::ValidationError)
    }

    /// Short operator-facing message for this code.
    pub const fn operator_message(&self) -> &'static str {
        match self {
            ErrorCode::Offline => "offline - the sale was saved and will sync later",
            ErrorCode::AuthError => "sign-in to the record store failed",
            ErrorCode::PermissionError => "no access to this stall's records",
            ErrorCode::NotFound => "record sheet not found",
            ErrorCode::ValidationError => "the entered data is invalid",
            ErrorCode::ApiError => "the record store reported an error",
            ErrorCode::UnknownError => "something went wrong",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Offline => "OFFLINE",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::PermissionError => "PERMISSION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Pos Error
// =============================================================================

/// The uniform error value carried through retry logic, the queue, the
/// error log and up to the UI boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct PosError {
    /// Classified failure code.
    pub code: ErrorCode,

    /// Human-readable description of what failed.
    pub message: String,

    /// Optional machine context (endpoint, range, queue item id).
    pub context: Option<String>,
}

impl PosError {
    /// Creates an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        PosError {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Attaches context (endpoint, range, item id) to the error.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Shorthand for an `Offline` error.
    pub fn offline(message: impl Into<String>) -> Self {
        PosError::new(ErrorCode::Offline, message)
    }

    /// Shorthand for a `ValidationError`.
    pub fn validation(message: impl Into<String>) -> Self {
        PosError::new(ErrorCode::ValidationError, message)
    }

    /// Shorthand for an `ApiError`.
    pub fn api(message: impl Into<String>) -> Self {
        PosError::new(ErrorCode::ApiError, message)
    }

    /// Shorthand for an `UnknownError`.
    pub fn unknown(message: impl Into<String>) -> Self {
        PosError::new(ErrorCode::UnknownError, message)
    }

    /// Classifies an HTTP status with the given message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        PosError::new(ErrorCode::from_status(status), message)
    }

    /// Delegates to [`ErrorCode::is_retryable`].
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

// =============================================================================
// Error Record
// =============================================================================

/// An append-only log entry describing a terminal failure.
///
/// Written whenever an operation gives up for good: retry exhaustion, a
/// queue item dropped at the attempt cap, or a non-retryable classification.
/// Evicted by age (default 7 days).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Unique id (UUID v4).
    pub id: Uuid,

    /// Classified failure code.
    pub code: ErrorCode,

    /// Human-readable description.
    pub message: String,

    /// Machine context (endpoint, range, queue item id).
    pub context: Option<String>,

    /// When the failure was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl ErrorRecord {
    /// Builds a record from a classified error at the given instant.
    ///
    /// The timestamp is passed in rather than read from a clock so the
    /// construction stays pure.
    pub fn from_error(error: &PosError, recorded_at: DateTime<Utc>) -> Self {
        ErrorRecord {
            id: Uuid::new_v4(),
            code: error.code,
            message: error.message.clone(),
            context: error.context.clone(),
            recorded_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ErrorCode::from_status(401), ErrorCode::AuthError);
        assert_eq!(ErrorCode::from_status(403), ErrorCode::PermissionError);
        assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(400), ErrorCode::ValidationError);
        assert_eq!(ErrorCode::from_status(422), ErrorCode::ValidationError);
        assert_eq!(ErrorCode::from_status(500), ErrorCode::ApiError);
        assert_eq!(ErrorCode::from_status(503), ErrorCode::ApiError);
        assert_eq!(ErrorCode::from_status(418), ErrorCode::UnknownError);
    }

    #[test]
    fn test_classification_is_total_over_the_status_space() {
        // Every representable status maps to exactly one code and the
        // mapping never panics.
        for status in 0..=u16::MAX {
            let _ = ErrorCode::from_status(status);
        }
    }

    #[test]
    fn test_retryability() {
        assert!(ErrorCode::Offline.is_retryable());
        assert!(ErrorCode::ApiError.is_retryable());
        assert!(ErrorCode::UnknownError.is_retryable());

        assert!(!ErrorCode::AuthError.is_retryable());
        assert!(!ErrorCode::PermissionError.is_retryable());
        assert!(!ErrorCode::NotFound.is_retryable());
        assert!(!ErrorCode::ValidationError.is_retryable());
    }

    #[test]
    fn test_validation_never_invites_retry() {
        assert!(!ErrorCode::ValidationError.invites_retry());
        assert!(ErrorCode::Offline.invites_retry());
        assert!(ErrorCode::ApiError.invites_retry());
    }

    #[test]
    fn test_error_display() {
        let err = PosError::new(ErrorCode::NotFound, "transaction sheet missing")
            .with_context("transactions!A:G");
        assert_eq!(err.to_string(), "NOT_FOUND: transaction sheet missing");
        assert_eq!(err.context.as_deref(), Some("transactions!A:G"));
    }

    #[test]
    fn test_error_record_from_error() {
        let err = PosError::api("HTTP 500").with_context("values/products!A:O");
        let now = Utc::now();
        let record = ErrorRecord::from_error(&err, now);

        assert_eq!(record.code, ErrorCode::ApiError);
        assert_eq!(record.message, "HTTP 500");
        assert_eq!(record.context.as_deref(), Some("values/products!A:O"));
        assert_eq!(record.recorded_at, now);
    }
}
