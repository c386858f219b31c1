//! # Domain Types
//!
//! Core domain types used throughout Yatai POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │  ProductStock   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name           │   │  id (UUID)      │   │  lot_volume     │       │
//! │  │  price(size)    │   │  items          │   │  total_lots     │       │
//! │  │  pour(size)     │   │  total/tendered │   │  remaining      │       │
//! │  │  stock          │   │  change/balance │   │  total_used     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SizeVariant   │   │ QueuedOperation │   │ SessionContext  │       │
//! │  │  S │ M │ L      │   │ method + range  │   │ tenant + online │       │
//! │  └─────────────────┘   │ + rows          │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The remote tabular store is the system of record; everything here is
//! either an immutable fact produced at the terminal (Transaction) or a
//! derived local view of remote rows (Product, ProductStock).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::money::Money;
use crate::volume::Volume;

// =============================================================================
// Tenant
// =============================================================================

/// Identifier of the active tenant (one festival stall = one tenant).
///
/// Every cache key and every queued operation is scoped by this value so
/// that switching stalls on a shared terminal can never leak data across
/// tenants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant id from the externally supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        TenantId(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Session Context
// =============================================================================

/// Explicit session state threaded through coordinator calls.
///
/// Connectivity and the active tenant are deliberately NOT ambient globals:
/// the coordinator receives this context and only the connectivity monitor
/// and tenant-switch events update it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// The active tenant.
    pub tenant: TenantId,

    /// Whether the runtime currently reports connectivity.
    pub online: bool,
}

impl SessionContext {
    /// Creates a session context.
    pub fn new(tenant: TenantId, online: bool) -> Self {
        SessionContext { tenant, online }
    }
}

// =============================================================================
// Size Variant
// =============================================================================

/// Pour size for a product (small / medium / large cup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeVariant {
    Small,
    Medium,
    Large,
}

impl SizeVariant {
    /// Single-letter code used in item display names (`IPA(M)`).
    pub const fn code(&self) -> char {
        match self {
            SizeVariant::Small => 'S',
            SizeVariant::Medium => 'M',
            SizeVariant::Large => 'L',
        }
    }

    /// Parses a single-letter size code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'S' => Some(SizeVariant::Small),
            'M' => Some(SizeVariant::Medium),
            'L' => Some(SizeVariant::Large),
            _ => None,
        }
    }

    /// All variants in display order.
    pub const ALL: [SizeVariant; 3] = [SizeVariant::Small, SizeVariant::Medium, SizeVariant::Large];
}

impl fmt::Display for SizeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// =============================================================================
// Product Stock
// =============================================================================

/// Lot-accounting state for one product.
///
/// ## Invariants
/// - `total_lots >= 0`
/// - `remaining_volume` in `[0, lot_volume)` while stock remains
/// - `total_used_volume` only ever grows
///
/// The authoritative copy lives in the remote store; this struct is a
/// derived local view and is mutated only by the ledger computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    /// Product this stock row belongs to.
    pub product_name: String,

    /// Capacity of one lot (keg).
    pub lot_volume: Volume,

    /// Purchase cost of one lot.
    pub lot_cost: Money,

    /// Unopened full lots plus the currently open one, counted in whole
    /// lots of remaining liquid (see the ledger for exact semantics).
    pub total_lots: i64,

    /// Unconsumed portion of the currently open lot.
    pub remaining_volume: Volume,

    /// Cumulative volume ever consumed for this product.
    pub total_used_volume: Volume,
}

impl ProductStock {
    /// Total liquid still available across all lots.
    pub fn available_volume(&self) -> Volume {
        Volume::from_ml(self.total_lots * self.lot_volume.ml() + self.remaining_volume.ml())
    }

    /// True when nothing is left to pour.
    pub fn is_depleted(&self) -> bool {
        !self.available_volume().is_positive()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product on the stall menu, with per-size prices and pour volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Display name (also the key used to match line items to stock rows).
    pub name: String,

    /// Price per size.
    pub price_small: Money,
    pub price_medium: Money,
    pub price_large: Money,

    /// Poured volume per size.
    pub pour_small: Volume,
    pub pour_medium: Volume,
    pub pour_large: Volume,

    /// Current lot-accounting state.
    pub stock: ProductStock,
}

impl Product {
    /// Price of the given size.
    pub fn price(&self, size: SizeVariant) -> Money {
        match size {
            SizeVariant::Small => self.price_small,
            SizeVariant::Medium => self.price_medium,
            SizeVariant::Large => self.price_large,
        }
    }

    /// Poured volume of the given size.
    pub fn pour_volume(&self, size: SizeVariant) -> Volume {
        match size {
            SizeVariant::Small => self.pour_small,
            SizeVariant::Medium => self.pour_medium,
            SizeVariant::Large => self.pour_large,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One line of a transaction.
///
/// Prices are snapshotted at sale time: a later menu price change must not
/// rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product name as it appears on the menu.
    pub product: String,

    /// Pour size; `None` for items without size-tracked inventory
    /// (e.g. a bag of snacks).
    pub size: Option<SizeVariant>,

    /// Number of units sold.
    pub quantity: i64,

    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
}

impl LineItem {
    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Display name including the size code, e.g. `IPA(M)`.
    pub fn display_name(&self) -> String {
        match self.size {
            Some(size) => format!("{}({})", self.product, size.code()),
            None => self.product.clone(),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A completed sale, immutable once constructed.
///
/// Produced by the terminal UI, validated by the coordinator before any
/// side effect is attempted. The id doubles as an idempotency key for
/// at-least-once delivery to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier (UUID v4, generated at the terminal).
    pub id: Uuid,

    /// Line items; never empty in a valid transaction.
    pub items: Vec<LineItem>,

    /// Sum of all line totals.
    pub total: Money,

    /// Cash the customer handed over.
    pub amount_tendered: Money,

    /// Change returned (`amount_tendered - total`).
    pub change_due: Money,

    /// When the operator completed the sale at the terminal.
    pub committed_at: DateTime<Utc>,

    /// Register balance after this sale.
    pub resulting_balance: Money,
}

impl Transaction {
    /// Recomputes the total from the line items.
    ///
    /// Validation compares this against the stored `total`.
    pub fn computed_total(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.line_total())
    }

    /// Compact item summary for the appended transaction row,
    /// e.g. `IPA(M) x2 @¥850, Stout(S) x1 @¥700`.
    pub fn items_summary(&self) -> String {
        self.items
            .iter()
            .map(|item| {
                format!(
                    "{} x{} @{}",
                    item.display_name(),
                    item.quantity,
                    item.unit_price
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// =============================================================================
// Remote Record Addressing
// =============================================================================

/// A range in the remote tabular store, e.g. `transactions!A:G`.
///
/// Opaque to the core; the remote store implementation interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordRange(String);

impl RecordRange {
    pub fn new(range: impl Into<String>) -> Self {
        RecordRange(range.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Queued Write Operations
// =============================================================================

/// The kind of write to replay against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMethod {
    /// Append rows after the last row of the range.
    Append,
    /// Overwrite the rows of the range.
    Update,
    /// Clear the rows of the range.
    Clear,
}

impl fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMethod::Append => f.write_str("append"),
            WriteMethod::Update => f.write_str("update"),
            WriteMethod::Clear => f.write_str("clear"),
        }
    }
}

/// A self-contained write operation, serializable into the offline queue.
///
/// Carries everything needed to replay later: the delta is computed at
/// commit time, so replay never depends on remote-side read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Tenant the write belongs to.
    pub tenant: TenantId,

    /// Write kind.
    pub method: WriteMethod,

    /// Target range.
    pub range: RecordRange,

    /// Row data (empty for `Clear`).
    pub rows: Vec<Vec<Value>>,
}

/// A durable queue entry wrapping a [`QueuedOperation`].
///
/// `id` is assigned by the store (auto-increment) and defines FIFO order.
/// The item is deleted on first successful replay; `attempt_count` past the
/// configured cap moves it to the error log instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Auto-increment id; lower id = enqueued earlier.
    pub id: i64,

    /// The write to replay.
    pub operation: QueuedOperation,

    /// When the write was accepted for later delivery.
    pub enqueued_at: DateTime<Utc>,

    /// Delivery attempts so far.
    pub attempt_count: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product: &str, size: SizeVariant, qty: i64, price: i64) -> LineItem {
        LineItem {
            product: product.to_string(),
            size: Some(size),
            quantity: qty,
            unit_price: Money::from_yen(price),
        }
    }

    #[test]
    fn test_size_codes_round_trip() {
        for size in SizeVariant::ALL {
            assert_eq!(SizeVariant::from_code(size.code()), Some(size));
        }
        assert_eq!(SizeVariant::from_code('X'), None);
    }

    #[test]
    fn test_line_item_display_name() {
        let item = line("IPA", SizeVariant::Medium, 2, 850);
        assert_eq!(item.display_name(), "IPA(M)");
        assert_eq!(item.line_total().yen(), 1700);

        let bare = LineItem {
            product: "Pretzel".to_string(),
            size: None,
            quantity: 1,
            unit_price: Money::from_yen(300),
        };
        assert_eq!(bare.display_name(), "Pretzel");
    }

    #[test]
    fn test_transaction_totals_and_summary() {
        let tx = Transaction {
            id: Uuid::new_v4(),
            items: vec![
                line("IPA", SizeVariant::Medium, 2, 850),
                line("Stout", SizeVariant::Small, 1, 700),
            ],
            total: Money::from_yen(2400),
            amount_tendered: Money::from_yen(3000),
            change_due: Money::from_yen(600),
            committed_at: Utc::now(),
            resulting_balance: Money::from_yen(52400),
        };

        assert_eq!(tx.computed_total().yen(), 2400);
        assert_eq!(tx.items_summary(), "IPA(M) x2 @¥850, Stout(S) x1 @¥700");
    }

    #[test]
    fn test_product_stock_available_volume() {
        let stock = ProductStock {
            product_name: "IPA".to_string(),
            lot_volume: Volume::from_ml(1000),
            lot_cost: Money::from_yen(8000),
            total_lots: 2,
            remaining_volume: Volume::from_ml(200),
            total_used_volume: Volume::from_ml(800),
        };

        assert_eq!(stock.available_volume().ml(), 2200);
        assert!(!stock.is_depleted());

        let empty = ProductStock {
            total_lots: 0,
            remaining_volume: Volume::zero(),
            ..stock
        };
        assert!(empty.is_depleted());
    }

    #[test]
    fn test_queued_operation_round_trips_through_json() {
        let op = QueuedOperation {
            tenant: TenantId::new("sheet-123"),
            method: WriteMethod::Append,
            range: RecordRange::new("transactions!A:G"),
            rows: vec![vec![
                Value::String("2026-08-01T10:00:00Z".into()),
                Value::from(1500),
            ]],
        };

        let json = serde_json::to_string(&op).unwrap();
        let back: QueuedOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
