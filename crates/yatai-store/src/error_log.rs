//! # Error Log
//!
//! Append-only log of terminal failures, evicted by age.
//!
//! Written whenever an operation gives up for good: a retry-exhausted
//! send, a queue item dropped at its attempt cap, or a non-retryable
//! classification. The stall owner reads it after service to see what
//! never reached the books.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use yatai_core::{ErrorCode, ErrorRecord};

use crate::error::{StoreError, StoreResult};

/// Default retention before records are pruned.
pub fn default_retention() -> chrono::Duration {
    chrono::Duration::days(7)
}

// =============================================================================
// Error Log
// =============================================================================

/// Repository over the `error_log` table.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    pool: SqlitePool,
}

impl ErrorLog {
    /// Creates an error-log handle over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        ErrorLog { pool }
    }

    /// Appends a record.
    ///
    /// Best-effort like the cache: failing to log a failure must not turn
    /// into a second failure for the operator.
    pub async fn append(&self, record: &ErrorRecord) {
        if let Err(err) = self.try_append(record).await {
            warn!(error = %err, code = %record.code, "Failed to append error record");
        }
    }

    async fn try_append(&self, record: &ErrorRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO error_log (id, code, message, context, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.code.to_string())
        .bind(&record.message)
        .bind(&record.context)
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(code = %record.code, "Appended error record");
        Ok(())
    }

    /// Returns the most recent records, newest first.
    pub async fn recent(&self, limit: u32) -> StoreResult<Vec<ErrorRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, message, context, recorded_at
            FROM error_log
            ORDER BY recorded_at DESC, id
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    /// Deletes records older than `retention`. Returns how many went.
    pub async fn prune_older_than(&self, retention: chrono::Duration) -> StoreResult<u64> {
        let cutoff = (Utc::now() - retention).to_rfc3339();

        let result = sqlx::query("DELETE FROM error_log WHERE recorded_at < ?1")
            .bind(&cutoff)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            debug!(pruned = result.rows_affected(), "Pruned old error records");
        }
        Ok(result.rows_affected())
    }
}

/// Maps a database row into an [`ErrorRecord`].
fn row_to_record(row: sqlx::sqlite::SqliteRow) -> StoreResult<ErrorRecord> {
    let id_raw: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_raw)
        .map_err(|e| StoreError::Corrupt(format!("error record id: {e}")))?;

    let code_raw: String = row.try_get("code")?;
    let code = parse_code(&code_raw)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown error code '{code_raw}'")))?;

    let recorded_at_raw: String = row.try_get("recorded_at")?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("error record timestamp: {e}")))?;

    Ok(ErrorRecord {
        id,
        code,
        message: row.try_get("message")?,
        context: row.try_get("context")?,
        recorded_at,
    })
}

/// Parses the stored code name back into the taxonomy.
fn parse_code(raw: &str) -> Option<ErrorCode> {
    match raw {
        "OFFLINE" => Some(ErrorCode::Offline),
        "AUTH_ERROR" => Some(ErrorCode::AuthError),
        "PERMISSION_ERROR" => Some(ErrorCode::PermissionError),
        "NOT_FOUND" => Some(ErrorCode::NotFound),
        "VALIDATION_ERROR" => Some(ErrorCode::ValidationError),
        "API_ERROR" => Some(ErrorCode::ApiError),
        "UNKNOWN_ERROR" => Some(ErrorCode::UnknownError),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
