//! # Store Error Types
//!
//! Error types for durable-store operations.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error type covering all local persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or connect to the database.
    #[error("Store connection failed: {0}")]
    ConnectionFailed(String),

    /// A query failed at runtime.
    #[error("Store query failed: {0}")]
    QueryFailed(String),

    /// A persisted value could not be decoded back into its type.
    ///
    /// Indicates either corruption or a schema drift between versions.
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::ConnectionFailed(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            other => StoreError::QueryFailed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::QueryFailed("no such table: offline_queue".into());
        assert!(err.to_string().contains("offline_queue"));
    }
}
