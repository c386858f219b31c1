//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     YATAI_REMOTE_URL=https://records.example/api                       │
//! │     YATAI_TENANT_ID=sheet-abc123                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/yatai-pos/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/jp.yatai.pos/sync.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     retry 3×1000ms, cache 1h/256 entries, queue cap 5, errors 7 days   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [remote]
//! base_url = "https://records.example/api"
//! timeout_secs = 30
//!
//! [tenant]
//! id = "sheet-abc123"
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 1000
//!
//! [cache]
//! max_age_secs = 3600
//! capacity = 256
//!
//! [queue]
//! max_attempts = 5
//!
//! [errors]
//! retention_days = 7
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use yatai_core::{PosError, PosResult, TenantId};
use yatai_store::StoreConfig;

use crate::retry::RetryPolicy;

// =============================================================================
// Sections
// =============================================================================

/// Remote record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    /// Base URL of the tabular service.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        RemoteSection {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Tenant settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantSection {
    /// The active tenant identifier (empty until configured).
    pub id: String,
}

/// Retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Linear backoff base in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        RetrySection {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Entries older than this count as absent.
    pub max_age_secs: i64,

    /// Entry capacity before LRU eviction.
    pub capacity: u32,
}

impl Default for CacheSection {
    fn default() -> Self {
        CacheSection {
            max_age_secs: 3600,
            capacity: 256,
        }
    }
}

/// Offline queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    /// Delivery attempts before an item moves to the error log.
    pub max_attempts: i64,
}

impl Default for QueueSection {
    fn default() -> Self {
        QueueSection { max_attempts: 5 }
    }
}

/// Error log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsSection {
    /// Days before old error records are pruned.
    pub retention_days: i64,
}

impl Default for ErrorsSection {
    fn default() -> Self {
        ErrorsSection { retention_days: 7 }
    }
}

// =============================================================================
// Sync Config
// =============================================================================

/// Full sync engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub remote: RemoteSection,
    pub tenant: TenantSection,
    pub retry: RetrySection,
    pub cache: CacheSection,
    pub queue: QueueSection,
    pub errors: ErrorsSection,
}

impl SyncConfig {
    /// Loads configuration: file (if present) under env overrides, then
    /// validates.
    pub fn load() -> PosResult<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading sync config file");
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    PosError::unknown(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            _ => {
                debug!("No sync config file; using defaults");
                SyncConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml_str(raw: &str) -> PosResult<Self> {
        toml::from_str(raw).map_err(|e| PosError::validation(format!("bad sync config: {e}")))
    }

    /// Default config file location for this platform.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("jp", "yatai", "yatai-pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    /// Applies `YATAI_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("YATAI_REMOTE_URL") {
            self.remote.base_url = url;
        }
        if let Ok(tenant) = std::env::var("YATAI_TENANT_ID") {
            self.tenant.id = tenant;
        }
        if let Ok(raw) = std::env::var("YATAI_RETRY_MAX") {
            match raw.parse() {
                Ok(v) => self.retry.max_retries = v,
                Err(_) => warn!(raw = %raw, "Ignoring non-numeric YATAI_RETRY_MAX"),
            }
        }
        if let Ok(raw) = std::env::var("YATAI_CACHE_MAX_AGE_SECS") {
            match raw.parse() {
                Ok(v) => self.cache.max_age_secs = v,
                Err(_) => warn!(raw = %raw, "Ignoring non-numeric YATAI_CACHE_MAX_AGE_SECS"),
            }
        }
    }

    /// Validates invariants the rest of the engine relies on.
    pub fn validate(&self) -> PosResult<()> {
        Url::parse(&self.remote.base_url)
            .map_err(|e| PosError::validation(format!("remote.base_url: {e}")))?;

        if self.remote.timeout_secs == 0 {
            return Err(PosError::validation("remote.timeout_secs must be positive"));
        }
        if self.cache.max_age_secs <= 0 {
            return Err(PosError::validation("cache.max_age_secs must be positive"));
        }
        if self.cache.capacity == 0 {
            return Err(PosError::validation("cache.capacity must be positive"));
        }
        if self.queue.max_attempts <= 0 {
            return Err(PosError::validation("queue.max_attempts must be positive"));
        }
        if self.errors.retention_days <= 0 {
            return Err(PosError::validation("errors.retention_days must be positive"));
        }

        Ok(())
    }

    /// The configured tenant, if any.
    pub fn tenant(&self) -> Option<TenantId> {
        if self.tenant.id.trim().is_empty() {
            None
        } else {
            Some(TenantId::new(self.tenant.id.trim()))
        }
    }

    /// Retry policy derived from this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Store configuration for the given database path.
    pub fn store_config(&self, database_path: impl Into<PathBuf>) -> StoreConfig {
        StoreConfig::new(database_path)
            .cache_max_age(chrono::Duration::seconds(self.cache.max_age_secs))
            .cache_capacity(self.cache.capacity)
    }

    /// Error log retention derived from this config.
    pub fn error_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.errors.retention_days)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.cache.max_age_secs, 3600);
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.errors.retention_days, 7);
        assert!(config.tenant().is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
            [remote]
            base_url = "https://records.example/api"

            [tenant]
            id = "sheet-abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.base_url, "https://records.example/api");
        assert_eq!(config.tenant().unwrap().as_str(), "sheet-abc");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.remote.timeout_secs, 30);
    }

    #[test]
    fn test_bad_toml_is_a_validation_error() {
        let err = SyncConfig::from_toml_str("retry = 'not a table'").unwrap_err();
        assert_eq!(err.code, yatai_core::ErrorCode::ValidationError);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SyncConfig::default();
        config.remote.base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.cache.max_age_secs = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.queue.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_settings() {
        let config = SyncConfig::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.error_retention(), chrono::Duration::days(7));
    }
}
