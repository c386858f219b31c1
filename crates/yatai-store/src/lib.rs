//! # yatai-store: Durable Local Store for Yatai POS
//!
//! This crate provides the terminal's durable local state. It uses SQLite
//! for storage so cache entries and queued writes survive a process
//! restart, which is the whole point of an offline-first register.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Yatai POS Data Flow                              │
//! │                                                                         │
//! │  SyncCoordinator (yatai-sync)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     yatai-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐  │   │
//! │  │   │     Store     │  │  LocalCache   │  │   OfflineQueue   │  │   │
//! │  │   │   (pool.rs)   │  │  (cache.rs)   │  │   (outbox.rs)    │  │   │
//! │  │   │               │  │               │  │                  │  │   │
//! │  │   │ SqlitePool    │◄─│ staleness     │  │ FIFO outbox      │  │   │
//! │  │   │ schema boot   │  │ LRU eviction  │  │ attempt counts   │  │   │
//! │  │   └───────────────┘  └───────────────┘  └──────────────────┘  │   │
//! │  │                      ┌───────────────┐                         │   │
//! │  │                      │   ErrorLog    │                         │   │
//! │  │                      │(error_log.rs) │                         │   │
//! │  │                      └───────────────┘                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL) - or `:memory:` in tests                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration and schema bootstrap
//! - [`error`] - Store error types
//! - [`cache`] - Local response cache with staleness and LRU eviction
//! - [`outbox`] - Durable FIFO queue of pending writes
//! - [`error_log`] - Append-only failure log with age-based eviction

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod error;
pub mod error_log;
pub mod outbox;
pub mod pool;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::{CacheEntry, CacheKey, LocalCache};
pub use error::{StoreError, StoreResult};
pub use error_log::ErrorLog;
pub use outbox::OfflineQueue;
pub use pool::{Store, StoreConfig};
