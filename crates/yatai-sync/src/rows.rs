//! # Row DTOs
//!
//! Translation between domain types and remote tabular rows.
//!
//! ## Sheet Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products!A2:L (one row per product)                                    │
//! │   A name │ B-D price S/M/L │ E-G pour S/M/L │ H lot_volume │            │
//! │   I lot_cost │ J total_lots │ K remaining_volume │ L total_used_volume  │
//! │                                                                         │
//! │  transactions!A:G (append-only)                                         │
//! │   A committed_at │ B id │ C items │ D total │ E tendered │              │
//! │   F change │ G resulting_balance                                        │
//! │                                                                         │
//! │  register_balance!A1 (single cell)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The remote service is loosely typed: numeric cells arrive as JSON
//! numbers or as strings depending on how the sheet was edited. Parsers
//! here accept both and fail closed with `VALIDATION_ERROR` on anything
//! else - a malformed row must never turn into a silent zero.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use yatai_core::{
    Money, PosError, PosResult, Product, ProductStock, RecordRange, StockUpdate, Transaction,
    Volume,
};

// =============================================================================
// Ranges
// =============================================================================

/// Range holding the product master rows.
pub fn products_range() -> RecordRange {
    RecordRange::new("products!A2:L")
}

/// Range the transaction log is appended to.
pub fn transactions_range() -> RecordRange {
    RecordRange::new("transactions!A:G")
}

/// Range for reading the transaction log back (skips the header row).
pub fn transactions_read_range() -> RecordRange {
    RecordRange::new("transactions!A2:G")
}

/// Cell holding the register balance.
pub fn balance_range() -> RecordRange {
    RecordRange::new("register_balance!A1")
}

/// Stock-triple cells (columns J:L) for the product at `position` within
/// the fetched product rows. Row 2 is the first data row.
pub fn stock_update_range(position: usize) -> RecordRange {
    let row = position + 2;
    RecordRange::new(format!("products!J{row}:L{row}"))
}

// =============================================================================
// Cell Accessors
// =============================================================================

/// Reads a string cell.
fn cell_str(row: &[Value], idx: usize, field: &str) -> PosResult<String> {
    match row.get(idx) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        other => Err(PosError::validation(format!(
            "column {field} is not a usable string (got {other:?})"
        ))),
    }
}

/// Reads an integer cell, accepting JSON numbers and numeric strings.
fn cell_i64(row: &[Value], idx: usize, field: &str) -> PosResult<i64> {
    match row.get(idx) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| PosError::validation(format!("column {field} is not an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| PosError::validation(format!("column {field} is not numeric: '{s}'"))),
        other => Err(PosError::validation(format!(
            "column {field} is missing or not numeric (got {other:?})"
        ))),
    }
}

// =============================================================================
// Product Rows
// =============================================================================

/// Parses one product master row. Fails closed on any malformed column.
pub fn parse_product_row(row: &[Value]) -> PosResult<Product> {
    let name = cell_str(row, 0, "name")?;

    Ok(Product {
        name: name.clone(),
        price_small: Money::from_yen(cell_i64(row, 1, "price_small")?),
        price_medium: Money::from_yen(cell_i64(row, 2, "price_medium")?),
        price_large: Money::from_yen(cell_i64(row, 3, "price_large")?),
        pour_small: Volume::from_ml(cell_i64(row, 4, "pour_small")?),
        pour_medium: Volume::from_ml(cell_i64(row, 5, "pour_medium")?),
        pour_large: Volume::from_ml(cell_i64(row, 6, "pour_large")?),
        stock: ProductStock {
            product_name: name,
            lot_volume: Volume::from_ml(cell_i64(row, 7, "lot_volume")?),
            lot_cost: Money::from_yen(cell_i64(row, 8, "lot_cost")?),
            total_lots: cell_i64(row, 9, "total_lots")?,
            remaining_volume: Volume::from_ml(cell_i64(row, 10, "remaining_volume")?),
            total_used_volume: Volume::from_ml(cell_i64(row, 11, "total_used_volume")?),
        },
    })
}

/// Parses all product rows, failing on the first malformed one.
pub fn parse_products(rows: &[Vec<Value>]) -> PosResult<Vec<Product>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            parse_product_row(row)
                .map_err(|e| e.with_context(format!("products row {}", i + 2)))
        })
        .collect()
}

/// Builds the full row for a product (inverse of [`parse_product_row`]).
pub fn product_row(product: &Product) -> Vec<Value> {
    vec![
        Value::String(product.name.clone()),
        Value::from(product.price_small.yen()),
        Value::from(product.price_medium.yen()),
        Value::from(product.price_large.yen()),
        Value::from(product.pour_small.ml()),
        Value::from(product.pour_medium.ml()),
        Value::from(product.pour_large.ml()),
        Value::from(product.stock.lot_volume.ml()),
        Value::from(product.stock.lot_cost.yen()),
        Value::from(product.stock.total_lots),
        Value::from(product.stock.remaining_volume.ml()),
        Value::from(product.stock.total_used_volume.ml()),
    ]
}

/// Builds the J:L stock-triple row for a ledger update.
pub fn stock_update_rows(update: &StockUpdate) -> Vec<Vec<Value>> {
    vec![vec![
        Value::from(update.total_lots),
        Value::from(update.remaining_volume.ml()),
        Value::from(update.total_used_volume.ml()),
    ]]
}

/// Applies a ledger update onto a product copy (for the optimistic cache).
pub fn apply_update(product: &Product, update: &StockUpdate) -> Product {
    let mut updated = product.clone();
    updated.stock.total_lots = update.total_lots;
    updated.stock.remaining_volume = update.remaining_volume;
    updated.stock.total_used_volume = update.total_used_volume;
    updated
}

// =============================================================================
// Transaction Rows
// =============================================================================

/// A transaction log row read back from the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub committed_at: DateTime<Utc>,
    pub id: Uuid,
    pub summary: String,
    pub total: Money,
    pub amount_tendered: Money,
    pub change_due: Money,
    pub resulting_balance: Money,
}

/// Builds the appended row for a committed transaction.
pub fn transaction_row(transaction: &Transaction) -> Vec<Value> {
    vec![
        Value::String(transaction.committed_at.to_rfc3339()),
        Value::String(transaction.id.to_string()),
        Value::String(transaction.items_summary()),
        Value::from(transaction.total.yen()),
        Value::from(transaction.amount_tendered.yen()),
        Value::from(transaction.change_due.yen()),
        Value::from(transaction.resulting_balance.yen()),
    ]
}

/// Parses one transaction log row. Fails closed on malformed columns.
pub fn parse_transaction_row(row: &[Value]) -> PosResult<TransactionRecord> {
    let committed_at_raw = cell_str(row, 0, "committed_at")?;
    let committed_at = DateTime::parse_from_rfc3339(&committed_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PosError::validation(format!("column committed_at: {e}")))?;

    let id_raw = cell_str(row, 1, "id")?;
    let id = Uuid::parse_str(&id_raw)
        .map_err(|e| PosError::validation(format!("column id: {e}")))?;

    Ok(TransactionRecord {
        committed_at,
        id,
        summary: cell_str(row, 2, "items")?,
        total: Money::from_yen(cell_i64(row, 3, "total")?),
        amount_tendered: Money::from_yen(cell_i64(row, 4, "amount_tendered")?),
        change_due: Money::from_yen(cell_i64(row, 5, "change_due")?),
        resulting_balance: Money::from_yen(cell_i64(row, 6, "resulting_balance")?),
    })
}

/// Sums the totals of the records committed on `date` (UTC).
pub fn daily_total(records: &[TransactionRecord], date: NaiveDate) -> Money {
    records
        .iter()
        .filter(|r| r.committed_at.date_naive() == date)
        .fold(Money::zero(), |acc, r| acc + r.total)
}

// =============================================================================
// Cache Payload Shape
// =============================================================================

/// Packs rows into a single JSON value for the cache.
pub fn rows_to_value(rows: &[Vec<Value>]) -> Value {
    Value::Array(rows.iter().cloned().map(Value::Array).collect())
}

/// Unpacks a cached payload back into rows. Fails closed on any other
/// shape - a corrupt cache entry must read as a miss, not as data.
pub fn value_to_rows(value: &Value) -> PosResult<Vec<Vec<Value>>> {
    let outer = value
        .as_array()
        .ok_or_else(|| PosError::validation("cached payload is not a row array"))?;

    outer
        .iter()
        .map(|row| {
            row.as_array()
                .cloned()
                .ok_or_else(|| PosError::validation("cached payload contains a non-array row"))
        })
        .collect()
}

// =============================================================================
// Balance Rows
// =============================================================================

/// Parses the register balance cell.
pub fn parse_balance(rows: &[Vec<Value>]) -> PosResult<Money> {
    let row = rows
        .first()
        .ok_or_else(|| PosError::validation("register balance cell is empty"))?;
    Ok(Money::from_yen(cell_i64(row, 0, "balance")?))
}

// =============================================================================
// Unit Tests
// =============================================================================
