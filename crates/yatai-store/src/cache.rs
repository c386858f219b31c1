//! # Local Response Cache
//!
//! The last successful response per (endpoint, params, tenant), used to
//! keep the terminal readable while offline.
//!
//! ## Cache Behaviour
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       LocalCache Semantics                              │
//! │                                                                         │
//! │  put(key, payload)                                                      │
//! │    • wholesale upsert with the current timestamp                        │
//! │    • best-effort: a storage failure is logged and swallowed             │
//! │    • evicts least-recently-stored entries beyond the capacity           │
//! │                                                                         │
//! │  get(key)                                                               │
//! │    • absent if missing                                                  │
//! │    • absent if older than max_age - the expired row is deleted          │
//! │      lazily on this read                                                │
//! │                                                                         │
//! │  invalidate_tenant(tenant)                                              │
//! │    • removes every entry for that tenant; called on tenant switch       │
//! │      so stall A's menu can never show up behind stall B's register      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache is a resiliency layer, never a hard dependency: reads that
//! fail here behave as a miss.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::fmt;
use tracing::{debug, warn};

use yatai_core::TenantId;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Cache Key
// =============================================================================

/// Deterministic cache key derived from tenant + endpoint + parameters.
///
/// The tenant id is embedded first so entries can be invalidated per
/// tenant and never collide across tenants. Parameters are serialized
/// through `serde_json`, whose object keys are sorted, so equal parameter
/// maps always produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for an endpoint read.
    pub fn new(tenant: &TenantId, endpoint: &str, params: &Value) -> Self {
        let params_json = serde_json::to_string(params).unwrap_or_else(|_| "null".to_string());
        CacheKey(format!("{}|{}|{}", tenant, endpoint, params_json))
    }

    /// Returns the key string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// A cached response: the payload plus when it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The key this entry was stored under.
    pub key: CacheKey,

    /// The last successful response payload.
    pub payload: Value,

    /// When the payload was stored.
    pub stored_at: DateTime<Utc>,
}

// =============================================================================
// Local Cache
// =============================================================================

/// SQLite-backed response cache.
#[derive(Debug, Clone)]
pub struct LocalCache {
    pool: SqlitePool,
    max_age: chrono::Duration,
    capacity: u32,
}

impl LocalCache {
    /// Creates a cache handle over the given pool.
    pub fn new(pool: SqlitePool, max_age: chrono::Duration, capacity: u32) -> Self {
        LocalCache {
            pool,
            max_age,
            capacity,
        }
    }

    /// Returns the entry for `key`, or `None` if missing or expired.
    ///
    /// Expired entries are deleted on this read rather than by a sweeper:
    /// the terminal has no idle maintenance window during service.
    pub async fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query(
            r#"
            SELECT payload, stored_at
            FROM cache_entries
            WHERE cache_key = ?1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let stored_at_raw: String = row.try_get("stored_at")?;
        let stored_at = DateTime::parse_from_rfc3339(&stored_at_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(format!("bad stored_at timestamp: {e}")))?;

        let age = Utc::now().signed_duration_since(stored_at);
        if age > self.max_age {
            debug!(key = %key, age_secs = age.num_seconds(), "Evicting expired cache entry");
            sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?1")
                .bind(key.as_str())
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let payload_raw: String = row.try_get("payload")?;
        let payload: Value = serde_json::from_str(&payload_raw)?;

        Ok(Some(CacheEntry {
            key: key.clone(),
            payload,
            stored_at,
        }))
    }

    /// Stores `payload` under `key`, replacing any previous entry wholesale.
    ///
    /// Best-effort by design: a full disk or a broken pool downgrades the
    /// cache, it must never fail a read that already succeeded remotely.
    pub async fn put(&self, key: &CacheKey, tenant: &TenantId, payload: &Value) {
        if let Err(err) = self.try_put(key, tenant, payload).await {
            warn!(key = %key, error = %err, "Cache put failed; continuing without caching");
        }
    }

    async fn try_put(&self, key: &CacheKey, tenant: &TenantId, payload: &Value) -> StoreResult<()> {
        let payload_json = serde_json::to_string(payload)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_key, tenant_id, payload, stored_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(cache_key)
            DO UPDATE SET
                tenant_id = excluded.tenant_id,
                payload   = excluded.payload,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(key.as_str())
        .bind(tenant.as_str())
        .bind(&payload_json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        // Capacity limit: drop the least-recently-stored overflow.
        sqlx::query(
            r#"
            DELETE FROM cache_entries
            WHERE cache_key NOT IN (
                SELECT cache_key FROM cache_entries
                ORDER BY stored_at DESC, cache_key
                LIMIT ?1
            )
            "#,
        )
        .bind(self.capacity as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes every entry belonging to the given tenant.
    ///
    /// Returns the number of removed entries.
    pub async fn invalidate_tenant(&self, tenant: &TenantId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE tenant_id = ?1")
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;

        debug!(
            tenant = %tenant,
            removed = result.rows_affected(),
            "Invalidated tenant cache"
        );
        Ok(result.rows_affected())
    }

    /// Number of entries currently cached (for diagnostics and tests).
    pub async fn len(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// True when the cache holds no entries.
    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use serde_json::json;

    async fn test_store() -> Store {
        Store::open(StoreConfig::in_memory()).await.unwrap()
    }

    fn tenant() -> TenantId {
        TenantId::new("sheet-abc")
    }

    #[test]
    fn test_key_is_deterministic_and_tenant_scoped() {
        let params = json!({"b": 2, "a": 1});
        let same_params = json!({"a": 1, "b": 2});

        let key_a = CacheKey::new(&TenantId::new("t1"), "products", &params);
        let key_b = CacheKey::new(&TenantId::new("t1"), "products", &same_params);
        assert_eq!(key_a, key_b);

        let other_tenant = CacheKey::new(&TenantId::new("t2"), "products", &params);
        assert_ne!(key_a, other_tenant);

        let other_endpoint = CacheKey::new(&TenantId::new("t1"), "balance", &params);
        assert_ne!(key_a, other_endpoint);
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let store = test_store().await;
        let cache = store.cache();
        let key = CacheKey::new(&tenant(), "products", &json!({}));
        let payload = json!([{"name": "IPA", "price": 700}]);

        cache.put(&key, &tenant(), &payload).await;
        let entry = cache.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.payload, payload);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = test_store().await;
        let cache = store.cache();
        let key = CacheKey::new(&tenant(), "nothing", &json!({}));
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_evicted() {
        let store = test_store().await;
        // Entries older than zero seconds are always expired.
        let cache = LocalCache::new(store.pool().clone(), chrono::Duration::seconds(-1), 256);
        let key = CacheKey::new(&tenant(), "products", &json!({}));

        cache.put(&key, &tenant(), &json!([1, 2, 3])).await;
        assert!(cache.get(&key).await.unwrap().is_none());

        // The expired row was deleted lazily by the read above.
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_replaces_wholesale() {
        let store = test_store().await;
        let cache = store.cache();
        let key = CacheKey::new(&tenant(), "balance", &json!({}));

        cache.put(&key, &tenant(), &json!({"balance": 1000})).await;
        cache.put(&key, &tenant(), &json!({"balance": 2500})).await;

        let entry = cache.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.payload, json!({"balance": 2500}));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = test_store().await;
        let cache = LocalCache::new(store.pool().clone(), chrono::Duration::hours(1), 2);

        for i in 0..4 {
            let key = CacheKey::new(&tenant(), &format!("endpoint-{i}"), &json!({}));
            cache.put(&key, &tenant(), &json!(i)).await;
        }

        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_tenant_spares_other_tenants() {
        let store = test_store().await;
        let cache = store.cache();
        let stall_a = TenantId::new("stall-a");
        let stall_b = TenantId::new("stall-b");

        let key_a = CacheKey::new(&stall_a, "products", &json!({}));
        let key_b = CacheKey::new(&stall_b, "products", &json!({}));
        cache.put(&key_a, &stall_a, &json!("a")).await;
        cache.put(&key_b, &stall_b, &json!("b")).await;

        let removed = cache.invalidate_tenant(&stall_a).await.unwrap();
        assert_eq!(removed, 1);

        assert!(cache.get(&key_a).await.unwrap().is_none());
        assert!(cache.get(&key_b).await.unwrap().is_some());
    }
}
