//! # yatai-sync: Synchronization Engine for Yatai POS
//!
//! Keeps the terminal usable and consistent while connectivity to the
//! remote record store comes and goes.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Data Flow                            │
//! │                                                                         │
//! │  READS                                                                  │
//! │  UI ──► SyncCoordinator ──┬── online ──► RetryExecutor ──► remote      │
//! │                           │                 │ success: cache result     │
//! │                           └── offline ──► LocalCache (stale ok)        │
//! │                                                                         │
//! │  WRITES (sale commit)                                                   │
//! │  UI ──► SyncCoordinator ──► validate ──► InventoryLedger (pure)        │
//! │                           ──► transaction row first, stock rows next   │
//! │                           ──► RetryExecutor ──► remote                  │
//! │                                  │ failure or offline                   │
//! │                                  ▼                                      │
//! │                             OfflineQueue (durable, FIFO)               │
//! │                                                                         │
//! │  ConnectivityMonitor: OFFLINE ──► ONLINE nudges the drain loop,        │
//! │  which replays the queue in order, exactly once per item.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - TOML + environment configuration
//! - [`coordinator`] - The [`coordinator::SyncCoordinator`] orchestrator
//! - [`error`] - Classification of transport/store failures into the taxonomy
//! - [`monitor`] - Online/offline monitoring and the drain nudge
//! - [`remote`] - The remote record store interface and its HTTP client
//! - [`retry`] - Bounded retry with linear backoff
//! - [`rows`] - Row DTOs between domain types and remote tabular rows

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod remote;
pub mod retry;
pub mod rows;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::SyncConfig;
pub use coordinator::{CommitOutcome, CommitStatus, DrainReport, SyncCoordinator};
pub use monitor::ConnectivityMonitor;
pub use remote::{HttpRecordStore, RemoteRecordStore};
pub use retry::{RetryExecutor, RetryPolicy, Sleeper, TokioSleeper};
