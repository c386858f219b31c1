//! # Store Pool Management
//!
//! Connection pool creation, configuration and schema bootstrap.
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Better crash recovery
//!
//! The schema is created with idempotent `CREATE TABLE IF NOT EXISTS`
//! statements at pool creation, so a fresh terminal and a restarted one go
//! through the same code path.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::LocalCache;
use crate::error::{StoreError, StoreResult};
use crate::error_log::ErrorLog;
use crate::outbox::OfflineQueue;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/yatai.db").max_connections(5);
/// let store = Store::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a single terminal)
    pub max_connections: u32,

    /// Connection acquire timeout.
    pub connect_timeout: Duration,

    /// Cache max-age before an entry counts as absent.
    /// Default: 1 hour
    pub cache_max_age: chrono::Duration,

    /// Cache capacity; least-recently-stored entries beyond this are
    /// evicted on insert. Default: 256
    pub cache_capacity: u32,
}

impl StoreConfig {
    /// Creates a store configuration with the given database path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            cache_max_age: chrono::Duration::hours(1),
            cache_capacity: 256,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the cache max-age.
    pub fn cache_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.cache_max_age = max_age;
        self
    }

    /// Sets the cache capacity.
    pub fn cache_capacity(mut self, capacity: u32) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Creates an in-memory store configuration (for testing).
    ///
    /// In-memory databases vanish when the last connection closes, so the
    /// pool is pinned to a single connection.
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            cache_max_age: chrono::Duration::hours(1),
            cache_capacity: 256,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Main store handle providing access to cache, outbox and error log.
///
/// Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    config: StoreConfig,
}

impl Store {
    /// Opens (and if necessary creates) the store.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite for a local terminal:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (safe from corruption, fast enough)
    /// 3. Creates the connection pool
    /// 4. Bootstraps the schema idempotently
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening local store"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Store pool created");

        let store = Store { pool, config };
        store.bootstrap_schema().await?;

        Ok(store)
    }

    /// Creates all tables and indexes if they do not exist yet.
    async fn bootstrap_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key  TEXT PRIMARY KEY,
                tenant_id  TEXT NOT NULL,
                payload    TEXT NOT NULL,
                stored_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_tenant ON cache_entries(tenant_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_stored_at ON cache_entries(stored_at)",
        )
        .execute(&self.pool)
        .await?;

        // AUTOINCREMENT keeps ids strictly increasing even after deletes,
        // which is what makes `ORDER BY id` a faithful FIFO.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offline_queue (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id     TEXT NOT NULL,
                operation     TEXT NOT NULL,
                enqueued_at   TEXT NOT NULL,
                attempt_count INTEGER NOT NULL DEFAULT 0,
                last_error    TEXT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_offline_queue_tenant ON offline_queue(tenant_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS error_log (
                id          TEXT PRIMARY KEY,
                code        TEXT NOT NULL,
                message     TEXT NOT NULL,
                context     TEXT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Store schema bootstrapped");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For ad-hoc queries in tests; production code goes through the
    /// typed accessors below.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the local response cache.
    pub fn cache(&self) -> LocalCache {
        LocalCache::new(
            self.pool.clone(),
            self.config.cache_max_age,
            self.config.cache_capacity,
        )
    }

    /// Returns the offline write queue.
    pub fn outbox(&self) -> OfflineQueue {
        OfflineQueue::new(self.pool.clone())
    }

    /// Returns the error log.
    pub fn error_log(&self) -> ErrorLog {
        ErrorLog::new(self.pool.clone())
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        info!("Closing local store");
        self.pool.close().await;
    }

    /// Checks if the store is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_opens() {
        let store = Store::open(StoreConfig::in_memory()).await.unwrap();
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_schema_bootstrap_is_idempotent() {
        let store = Store::open(StoreConfig::in_memory()).await.unwrap();
        store.bootstrap_schema().await.unwrap();
        store.bootstrap_schema().await.unwrap();
        assert!(store.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("/tmp/yatai.db")
            .max_connections(10)
            .cache_capacity(32)
            .cache_max_age(chrono::Duration::minutes(5));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.cache_max_age, chrono::Duration::minutes(5));
    }
}
