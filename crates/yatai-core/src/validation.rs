//! # Validation Module
//!
//! Transaction invariant validation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal UI (external)                                       │
//! │  ├── Basic format checks (empty cart, tender amount entered)           │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any side effect)                         │
//! │  ├── Structural checks (non-empty items, sane quantities)              │
//! │  ├── Monetary checks (non-negative, tendered >= total)                 │
//! │  └── Consistency checks (total matches items, change matches tender)   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Remote record store                                          │
//! │  └── Whatever the tabular service enforces on appended rows            │
//! │                                                                         │
//! │  A transaction that fails here is rejected with VALIDATION_ERROR       │
//! │  synchronously: nothing is sent, nothing is queued.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{PosError, PosResult};
use crate::types::{LineItem, Transaction};
use crate::{MAX_ITEM_QUANTITY, MAX_TRANSACTION_ITEMS};

// =============================================================================
// Line Item Validation
// =============================================================================

/// Validates a single line item.
///
/// ## Rules
/// - Product name must not be empty
/// - Quantity must be positive and at most [`MAX_ITEM_QUANTITY`]
/// - Unit price must be non-negative (zero allowed for giveaways)
pub fn validate_line_item(item: &LineItem) -> PosResult<()> {
    if item.product.trim().is_empty() {
        return Err(PosError::validation("line item has an empty product name"));
    }

    if item.quantity <= 0 {
        return Err(PosError::validation(format!(
            "quantity for {} must be positive, got {}",
            item.product, item.quantity
        )));
    }

    if item.quantity > MAX_ITEM_QUANTITY {
        return Err(PosError::validation(format!(
            "quantity for {} exceeds the maximum of {}",
            item.product, MAX_ITEM_QUANTITY
        )));
    }

    if item.unit_price.is_negative() {
        return Err(PosError::validation(format!(
            "unit price for {} must not be negative",
            item.product
        )));
    }

    Ok(())
}

// =============================================================================
// Transaction Validation
// =============================================================================

/// Validates a complete transaction before any side effect is attempted.
///
/// ## Rules
/// - At least one line item, at most [`MAX_TRANSACTION_ITEMS`]
/// - Every line item passes [`validate_line_item`]
/// - `total` is non-negative and equals the sum of line totals
/// - `amount_tendered` covers `total`
/// - `change_due` equals `amount_tendered - total`
/// - `resulting_balance` is non-negative
pub fn validate_transaction(transaction: &Transaction) -> PosResult<()> {
    if transaction.items.is_empty() {
        return Err(PosError::validation("transaction has no items"));
    }

    if transaction.items.len() > MAX_TRANSACTION_ITEMS {
        return Err(PosError::validation(format!(
            "transaction has {} items, the maximum is {}",
            transaction.items.len(),
            MAX_TRANSACTION_ITEMS
        )));
    }

    for item in &transaction.items {
        validate_line_item(item)?;
    }

    if transaction.total.is_negative() {
        return Err(PosError::validation("total must not be negative"));
    }

    let computed = transaction.computed_total();
    if computed != transaction.total {
        return Err(PosError::validation(format!(
            "total {} does not match the item sum {}",
            transaction.total, computed
        )));
    }

    if transaction.amount_tendered < transaction.total {
        return Err(PosError::validation(format!(
            "tendered {} is less than the total {}",
            transaction.amount_tendered, transaction.total
        )));
    }

    if transaction.change_due != transaction.amount_tendered - transaction.total {
        return Err(PosError::validation(format!(
            "change {} does not match tendered {} minus total {}",
            transaction.change_due, transaction.amount_tendered, transaction.total
        )));
    }

    if transaction.resulting_balance.is_negative() {
        return Err(PosError::validation(
            "resulting register balance must not be negative",
        ));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::money::Money;
    use crate::types::SizeVariant;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(qty: i64, price: i64) -> LineItem {
        LineItem {
            product: "IPA".to_string(),
            size: Some(SizeVariant::Medium),
            quantity: qty,
            unit_price: Money::from_yen(price),
        }
    }

    fn valid_transaction() -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            items: vec![item(2, 850)],
            total: Money::from_yen(1700),
            amount_tendered: Money::from_yen(2000),
            change_due: Money::from_yen(300),
            committed_at: Utc::now(),
            resulting_balance: Money::from_yen(1700),
        }
    }

    #[test]
    fn test_valid_transaction_passes() {
        assert!(validate_transaction(&valid_transaction()).is_ok());
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut tx = valid_transaction();
        tx.items.clear();
        tx.total = Money::zero();

        let err = validate_transaction(&tx).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_bad_line_items_rejected() {
        assert!(validate_line_item(&item(0, 850)).is_err());
        assert!(validate_line_item(&item(-1, 850)).is_err());
        assert!(validate_line_item(&item(1000, 850)).is_err());
        assert!(validate_line_item(&item(1, -100)).is_err());
        assert!(validate_line_item(&item(1, 0)).is_ok());

        let mut nameless = item(1, 850);
        nameless.product = "  ".to_string();
        assert!(validate_line_item(&nameless).is_err());
    }

    #[test]
    fn test_total_must_match_items() {
        let mut tx = valid_transaction();
        tx.total = Money::from_yen(9999);
        assert!(validate_transaction(&tx).is_err());
    }

    #[test]
    fn test_insufficient_tender_rejected() {
        let mut tx = valid_transaction();
        tx.amount_tendered = Money::from_yen(1000);
        tx.change_due = Money::from_yen(-700);
        assert!(validate_transaction(&tx).is_err());
    }

    #[test]
    fn test_change_must_match_tender() {
        let mut tx = valid_transaction();
        tx.change_due = Money::from_yen(500);
        assert!(validate_transaction(&tx).is_err());
    }

    #[test]
    fn test_negative_balance_rejected() {
        let mut tx = valid_transaction();
        tx.resulting_balance = Money::from_yen(-1);
        assert!(validate_transaction(&tx).is_err());
    }
}
