//! # yatai-core: Pure Business Logic for Yatai POS
//!
//! This crate is the **heart** of the Yatai POS terminal. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Yatai POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Terminal UI (external)                       │   │
//! │  │    Product grid ──► Cart ──► Tender ──► Change display         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  yatai-sync (SyncCoordinator)                   │   │
//! │  │    read, commit_transaction, drain_queue, connectivity          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ yatai-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │ validation│  │   │
//! │  │   │  Product  │  │   yen     │  │ lot math  │  │   rules   │  │   │
//! │  │   │Transaction│  │  volume   │  │ rollover  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, QueueItem, etc.)
//! - [`money`] - Money type with integer yen arithmetic (no floating point!)
//! - [`volume`] - Volume type with integer millilitre arithmetic
//! - [`error`] - The closed error taxonomy shared by every layer
//! - [`ledger`] - Lot-consumption inventory computation
//! - [`validation`] - Transaction invariant validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Quantities**: Money is whole yen (i64), volume is whole
//!    millilitres (i64) - float drift never reaches the books
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! Purity is what lets the ledger run identically whether a sale is
//! committed online or replayed later from the offline queue.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;
pub mod volume;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use yatai_core::Money` instead of
// `use yatai_core::money::Money`

pub use error::{ErrorCode, ErrorRecord, PosError, PosResult};
pub use ledger::{apply_transaction, LedgerOutcome, OversoldWarning, StockUpdate};
pub use money::Money;
pub use types::*;
pub use volume::Volume;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single transaction.
///
/// Keeps a single appended row at a size the remote tabular store accepts
/// and protects against runaway carts.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Protects against fat-finger quantities (1000 poured instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
