//! # Failure Classification
//!
//! Maps raw transport and store failures into the closed taxonomy defined
//! in `yatai-core`. Every failure that crosses this crate's boundary is a
//! [`PosError`] carrying exactly one [`yatai_core::ErrorCode`].
//!
//! HTTP status classification itself lives in the core
//! (`ErrorCode::from_status`) because it is pure; this module covers the
//! failures only this crate can see: `reqwest` transport errors, JSON
//! decode errors, and local-store errors.

use yatai_core::PosError;
use yatai_store::StoreError;

// =============================================================================
// Transport Classification
// =============================================================================

/// Classifies a `reqwest` failure.
///
/// ## Mapping
/// - connect / timeout failures → `OFFLINE` (transient, retried)
/// - body decode failures → `VALIDATION_ERROR` (the payload is malformed,
///   retrying cannot help)
/// - everything else → `UNKNOWN_ERROR`
pub fn classify_transport_error(err: &reqwest::Error) -> PosError {
    if err.is_connect() || err.is_timeout() {
        PosError::offline(format!("request never reached the record store: {err}"))
    } else if err.is_decode() {
        PosError::validation(format!("record store response was malformed: {err}"))
    } else {
        PosError::unknown(format!("transport failure: {err}"))
    }
}

/// Classifies a non-success HTTP response.
pub fn classify_status(status: u16, context: &str) -> PosError {
    PosError::from_status(status, format!("record store returned HTTP {status}"))
        .with_context(context.to_string())
}

// =============================================================================
// Store Classification
// =============================================================================

/// Classifies a local-store failure.
///
/// Local persistence problems are not part of the remote taxonomy; they
/// surface as `UNKNOWN_ERROR` with the store's own message so the error
/// log still tells the operator what actually broke.
pub fn classify_store_error(err: &StoreError, context: &str) -> PosError {
    PosError::unknown(format!("local store failure: {err}")).with_context(context.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use yatai_core::ErrorCode;

    #[test]
    fn test_status_classification_goes_through_the_taxonomy() {
        assert_eq!(classify_status(401, "read").code, ErrorCode::AuthError);
        assert_eq!(classify_status(403, "read").code, ErrorCode::PermissionError);
        assert_eq!(classify_status(404, "read").code, ErrorCode::NotFound);
        assert_eq!(classify_status(500, "read").code, ErrorCode::ApiError);
        assert_eq!(classify_status(400, "read").code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_store_errors_map_to_unknown_with_context() {
        let err = StoreError::QueryFailed("disk I/O error".into());
        let classified = classify_store_error(&err, "enqueue");

        assert_eq!(classified.code, ErrorCode::UnknownError);
        assert_eq!(classified.context.as_deref(), Some("enqueue"));
        assert!(classified.message.contains("disk I/O error"));
    }
}
