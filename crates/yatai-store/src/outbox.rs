//! # Offline Write Queue
//!
//! Durable FIFO outbox of writes that could not be sent immediately.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  COMMIT WHILE OFFLINE (or after a failed send)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    offline_queue Table                          │   │
//! │  │                                                                 │   │
//! │  │  id │ tenant  │ operation (JSON)       │ attempts │ enqueued_at │   │
//! │  │  ───┼─────────┼────────────────────────┼──────────┼─────────────│   │
//! │  │  1  │ sheet-a │ append transactions…   │ 0        │ 10:01:12    │   │
//! │  │  2  │ sheet-a │ update products…       │ 0        │ 10:01:12    │   │
//! │  │  3  │ sheet-a │ append transactions…   │ 2        │ 10:04:55    │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │  drain (yatai-sync)                     │
//! │                               ▼                                         │
//! │  per item, strictly by id:                                              │
//! │    deliver → success → remove(id)                                       │
//! │            → failure → record_failure(id) bumps attempts;               │
//! │                        past the cap the coordinator moves the item      │
//! │                        to the error log and removes it, so one          │
//! │                        poisoned item never blocks the queue             │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                        │
//! │  • enqueue failures are surfaced - a silently dropped write is          │
//! │    worse than a visible failure                                         │
//! │  • items survive process restart                                        │
//! │  • AUTOINCREMENT ids define FIFO order per tenant                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use yatai_core::{QueueItem, QueuedOperation, TenantId};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Offline Queue
// =============================================================================

/// Repository over the `offline_queue` table.
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    pool: SqlitePool,
}

impl OfflineQueue {
    /// Creates a queue handle over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        OfflineQueue { pool }
    }

    /// Appends an operation to the queue with `attempt_count = 0`.
    ///
    /// Storage failures propagate to the caller: the operator must learn
    /// that the write was NOT accepted for later delivery.
    pub async fn enqueue(&self, operation: &QueuedOperation) -> StoreResult<QueueItem> {
        let operation_json = serde_json::to_string(operation)?;
        let enqueued_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO offline_queue (tenant_id, operation, enqueued_at, attempt_count)
            VALUES (?1, ?2, ?3, 0)
            "#,
        )
        .bind(operation.tenant.as_str())
        .bind(&operation_json)
        .bind(enqueued_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            id,
            tenant = %operation.tenant,
            method = %operation.method,
            range = %operation.range,
            "Queued write for later delivery"
        );

        Ok(QueueItem {
            id,
            operation: operation.clone(),
            enqueued_at,
            attempt_count: 0,
        })
    }

    /// Returns all pending items for a tenant, oldest first.
    pub async fn list_pending(&self, tenant: &TenantId) -> StoreResult<Vec<QueueItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, operation, enqueued_at, attempt_count
            FROM offline_queue
            WHERE tenant_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(row_to_item(row)?);
        }
        Ok(items)
    }

    /// Deletes an item after successful delivery (or after it was moved to
    /// the error log).
    pub async fn remove(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM offline_queue WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(id, "Removed queue item");
        Ok(())
    }

    /// Records a failed delivery attempt and returns the new attempt count.
    pub async fn record_failure(&self, id: i64, error: &str) -> StoreResult<i64> {
        sqlx::query(
            r#"
            UPDATE offline_queue
            SET attempt_count = attempt_count + 1,
                last_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT attempt_count FROM offline_queue WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        debug!(id, attempts = count, "Recorded failed delivery attempt");
        Ok(count)
    }

    /// Counts pending items for a tenant.
    pub async fn count_pending(&self, tenant: &TenantId) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM offline_queue WHERE tenant_id = ?1")
                .bind(tenant.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Maps a database row into a [`QueueItem`].
fn row_to_item(row: sqlx::sqlite::SqliteRow) -> StoreResult<QueueItem> {
    let id: i64 = row.try_get("id")?;

    let operation_raw: String = row.try_get("operation")?;
    let operation: QueuedOperation = serde_json::from_str(&operation_raw)
        .map_err(|e| StoreError::Corrupt(format!("queue item {id} operation: {e}")))?;

    let enqueued_at_raw: String = row.try_get("enqueued_at")?;
    let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("queue item {id} enqueued_at: {e}")))?;

    let attempt_count: i64 = row.try_get("attempt_count")?;

    Ok(QueueItem {
        id,
        operation,
        enqueued_at,
        attempt_count,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use serde_json::json;
    use yatai_core::{RecordRange, WriteMethod};

    fn op(tenant: &str, marker: i64) -> QueuedOperation {
        QueuedOperation {
            tenant: TenantId::new(tenant),
            method: WriteMethod::Append,
            range: RecordRange::new("transactions!A:G"),
            rows: vec![vec![json!(marker)]],
        }
    }

    async fn test_queue() -> (Store, OfflineQueue) {
        let store = Store::open(StoreConfig::in_memory()).await.unwrap();
        let queue = store.outbox();
        (store, queue)
    }

    #[tokio::test]
    async fn test_enqueue_assigns_increasing_ids() {
        let (_store, queue) = test_queue().await;

        let first = queue.enqueue(&op("t", 1)).await.unwrap();
        let second = queue.enqueue(&op("t", 2)).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.attempt_count, 0);
    }

    #[tokio::test]
    async fn test_list_pending_is_fifo() {
        let (_store, queue) = test_queue().await;
        let tenant = TenantId::new("t");

        for marker in 1..=3 {
            queue.enqueue(&op("t", marker)).await.unwrap();
        }

        let items = queue.list_pending(&tenant).await.unwrap();
        let markers: Vec<i64> = items
            .iter()
            .map(|i| i.operation.rows[0][0].as_i64().unwrap())
            .collect();
        assert_eq!(markers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_remove_deletes_item() {
        let (_store, queue) = test_queue().await;
        let tenant = TenantId::new("t");

        let item = queue.enqueue(&op("t", 1)).await.unwrap();
        queue.remove(item.id).await.unwrap();

        assert_eq!(queue.count_pending(&tenant).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_failure_bumps_attempts() {
        let (_store, queue) = test_queue().await;

        let item = queue.enqueue(&op("t", 1)).await.unwrap();
        assert_eq!(queue.record_failure(item.id, "HTTP 500").await.unwrap(), 1);
        assert_eq!(queue.record_failure(item.id, "HTTP 500").await.unwrap(), 2);

        let items = queue.list_pending(&TenantId::new("t")).await.unwrap();
        assert_eq!(items[0].attempt_count, 2);
    }

    #[tokio::test]
    async fn test_queue_is_tenant_scoped() {
        let (_store, queue) = test_queue().await;

        queue.enqueue(&op("stall-a", 1)).await.unwrap();
        queue.enqueue(&op("stall-b", 2)).await.unwrap();

        let a_items = queue.list_pending(&TenantId::new("stall-a")).await.unwrap();
        assert_eq!(a_items.len(), 1);
        assert_eq!(a_items[0].operation.tenant.as_str(), "stall-a");
    }

    #[tokio::test]
    async fn test_items_survive_store_reopen() {
        // A file-backed store keeps queue items across close/reopen.
        let dir = std::env::temp_dir().join(format!("yatai-outbox-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("queue-reopen.db");
        let _ = std::fs::remove_file(&path);

        let config = StoreConfig::new(&path);
        {
            let store = Store::open(config.clone()).await.unwrap();
            store.outbox().enqueue(&op("t", 42)).await.unwrap();
            store.close().await;
        }

        let store = Store::open(config).await.unwrap();
        let items = store
            .outbox()
            .list_pending(&TenantId::new("t"))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].operation.rows[0][0], json!(42));

        store.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
