//! # Inventory Ledger
//!
//! Lot-consumption math for committed sales.
//!
//! ## Lot Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Lot Accounting                                    │
//! │                                                                         │
//! │  A "lot" is one keg. Sales consume fractional volume out of the        │
//! │  currently open lot; crossing a lot boundary opens the next keg.       │
//! │                                                                         │
//! │  lot_volume = 1000ml                                                    │
//! │                                                                         │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐                                │
//! │  │ full keg │ │ full keg │ │ ▓▓▓░░░░░ │ ← open keg, remaining = 200   │
//! │  └──────────┘ └──────────┘ └──────────┘                                │
//! │   total_lots = 2                                                        │
//! │                                                                         │
//! │  Sell 300ml:                                                            │
//! │    200ml drains the open keg, 100ml comes out of the next one          │
//! │    → total_lots = 1, remaining = 900, total_used += 300                 │
//! │                                                                         │
//! │  OVERSELL: consumption beyond all kegs clamps to {0 lots, 0ml} and      │
//! │  yields a warning. The cash sale has already happened at the            │
//! │  terminal, so inventory accuracy is advisory - the ledger records       │
//! │  best-effort state instead of rejecting the sale.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The computation is pure: no I/O, no clock, no hidden counters. Running
//! it twice with the same prior state and the same transaction yields the
//! same result, which is what makes offline replay safe.

use crate::money::Money;
use crate::types::{Product, Transaction};
use crate::volume::Volume;

// =============================================================================
// Outcome Types
// =============================================================================

/// New stock triple for one product, to be persisted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    /// Product the update applies to.
    pub product_name: String,

    /// Full lots still available (including the open one's whole-lot part).
    pub total_lots: i64,

    /// Unconsumed portion of the open lot, always in `[0, lot_volume)`.
    pub remaining_volume: Volume,

    /// Cumulative consumed volume, monotonic across updates.
    pub total_used_volume: Volume,
}

/// Raised alongside (never instead of) a [`StockUpdate`] when a sale
/// consumed more than the books said was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OversoldWarning {
    /// Product that went negative on paper.
    pub product_name: String,

    /// Volume the sale tried to consume.
    pub attempted: Volume,

    /// Volume the books had available before the sale.
    pub available: Volume,
}

/// Result of applying one transaction to the current stock state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerOutcome {
    /// One update per product the transaction touched.
    pub updates: Vec<StockUpdate>,

    /// Oversell warnings; empty when the books covered the sale.
    pub warnings: Vec<OversoldWarning>,
}

impl LedgerOutcome {
    /// True when at least one product was oversold.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// =============================================================================
// Ledger Computation
// =============================================================================

/// Applies a committed transaction's consumption to the given products.
///
/// For each product referenced by a sized line item:
/// 1. Sum the consumed volume (`pour_volume(size) × quantity` per item).
/// 2. Subtract it from the available volume
///    (`total_lots × lot_volume + remaining_volume`), letting whole-lot
///    crossings decrement `total_lots`.
/// 3. Clamp to `{total_lots: 0, remaining_volume: 0}` with an
///    [`OversoldWarning`] when consumption exceeds availability;
///    `total_used_volume` grows by the full consumed amount either way.
///
/// Line items without a size, or naming a product not in `products`, do
/// not affect inventory (the stall sells a few untracked goods).
///
/// ## Example
/// ```rust
/// use yatai_core::ledger::apply_transaction;
/// # use yatai_core::money::Money;
/// # use yatai_core::volume::Volume;
/// # use yatai_core::types::*;
/// # use chrono::Utc;
/// # use uuid::Uuid;
/// # let product = Product {
/// #     name: "IPA".into(),
/// #     price_small: Money::from_yen(700),
/// #     price_medium: Money::from_yen(850),
/// #     price_large: Money::from_yen(1000),
/// #     pour_small: Volume::from_ml(250),
/// #     pour_medium: Volume::from_ml(350),
/// #     pour_large: Volume::from_ml(500),
/// #     stock: ProductStock {
/// #         product_name: "IPA".into(),
/// #         lot_volume: Volume::from_ml(1000),
/// #         lot_cost: Money::from_yen(8000),
/// #         total_lots: 2,
/// #         remaining_volume: Volume::from_ml(200),
/// #         total_used_volume: Volume::from_ml(800),
/// #     },
/// # };
/// # let tx = Transaction {
/// #     id: Uuid::new_v4(),
/// #     items: vec![LineItem {
/// #         product: "IPA".into(),
/// #         size: Some(SizeVariant::Small),
/// #         quantity: 1,
/// #         unit_price: Money::from_yen(700),
/// #     }],
/// #     total: Money::from_yen(700),
/// #     amount_tendered: Money::from_yen(1000),
/// #     change_due: Money::from_yen(300),
/// #     committed_at: Utc::now(),
/// #     resulting_balance: Money::from_yen(700),
/// # };
/// let outcome = apply_transaction(&[product], &tx);
/// assert_eq!(outcome.updates.len(), 1);
/// ```
pub fn apply_transaction(products: &[Product], transaction: &Transaction) -> LedgerOutcome {
    let mut outcome = LedgerOutcome::default();

    for product in products {
        let consumed = consumed_volume(product, transaction);
        if !consumed.is_positive() {
            continue;
        }

        let lot_ml = product.stock.lot_volume.ml();
        if lot_ml <= 0 {
            // A stock row without a lot size cannot be divided into lots;
            // leave it untouched rather than divide by zero.
            continue;
        }

        let used = product.stock.total_used_volume + consumed;
        let available = product.stock.available_volume();

        if consumed.ml() > available.ml() {
            outcome.warnings.push(OversoldWarning {
                product_name: product.name.clone(),
                attempted: consumed,
                available,
            });
            outcome.updates.push(StockUpdate {
                product_name: product.name.clone(),
                total_lots: 0,
                remaining_volume: Volume::zero(),
                total_used_volume: used,
            });
            continue;
        }

        let left = available.ml() - consumed.ml();
        outcome.updates.push(StockUpdate {
            product_name: product.name.clone(),
            total_lots: left / lot_ml,
            remaining_volume: Volume::from_ml(left % lot_ml),
            total_used_volume: used,
        });
    }

    outcome
}

/// Total volume the transaction consumes from one product.
fn consumed_volume(product: &Product, transaction: &Transaction) -> Volume {
    transaction
        .items
        .iter()
        .filter(|item| item.product == product.name)
        .filter_map(|item| {
            item.size
                .map(|size| product.pour_volume(size).multiply_quantity(item.quantity))
        })
        .fold(Volume::zero(), |acc, v| acc + v)
}

/// Estimated cost of goods consumed by an update, for the dashboard.
///
/// Whole lots are costed at `lot_cost`; the open lot is prorated.
pub fn consumed_cost(product: &Product, update: &StockUpdate) -> Money {
    let consumed =
        update.total_used_volume.ml() - product.stock.total_used_volume.ml();
    let lot_ml = product.stock.lot_volume.ml();
    if consumed <= 0 || lot_ml <= 0 {
        return Money::zero();
    }

    let cost_per_ml_num = product.stock.lot_cost.yen();
    Money::from_yen(consumed * cost_per_ml_num / lot_ml)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineItem, ProductStock, SizeVariant};
    use chrono::Utc;
    use uuid::Uuid;

    fn product(lots: i64, remaining_ml: i64, used_ml: i64) -> Product {
        Product {
            name: "IPA".to_string(),
            price_small: Money::from_yen(700),
            price_medium: Money::from_yen(850),
            price_large: Money::from_yen(1000),
            pour_small: Volume::from_ml(250),
            pour_medium: Volume::from_ml(350),
            pour_large: Volume::from_ml(500),
            stock: ProductStock {
                product_name: "IPA".to_string(),
                lot_volume: Volume::from_ml(1000),
                lot_cost: Money::from_yen(8000),
                total_lots: lots,
                remaining_volume: Volume::from_ml(remaining_ml),
                total_used_volume: Volume::from_ml(used_ml),
            },
        }
    }

    fn sale(items: Vec<LineItem>) -> Transaction {
        let total = items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.line_total());
        Transaction {
            id: Uuid::new_v4(),
            items,
            total,
            amount_tendered: total,
            change_due: Money::zero(),
            committed_at: Utc::now(),
            resulting_balance: total,
        }
    }

    fn pour(size: SizeVariant, qty: i64) -> LineItem {
        LineItem {
            product: "IPA".to_string(),
            size: Some(size),
            quantity: qty,
            unit_price: Money::from_yen(700),
        }
    }

    #[test]
    fn test_consumption_within_open_lot() {
        // 200ml out of 700ml remaining: no lot boundary crossed.
        let p = product(2, 700, 300);
        let outcome = apply_transaction(&[p], &sale(vec![pour(SizeVariant::Small, 1)])); // 250ml

        let update = &outcome.updates[0];
        assert_eq!(update.total_lots, 2);
        assert_eq!(update.remaining_volume.ml(), 450);
        assert_eq!(update.total_used_volume.ml(), 550);
        assert!(!outcome.has_warnings());
    }

    #[test]
    fn test_rollover_crosses_one_lot() {
        // 200ml remaining, 2 lots; consuming 300ml overflows by 100ml,
        // so one keg is opened: lots 2 -> 1, remaining 1000 - 100 = 900.
        let mut p = product(2, 200, 800);
        p.pour_small = Volume::from_ml(300);

        let outcome = apply_transaction(&[p], &sale(vec![pour(SizeVariant::Small, 1)]));

        let update = &outcome.updates[0];
        assert_eq!(update.total_lots, 1);
        assert_eq!(update.remaining_volume.ml(), 900);
        assert_eq!(update.total_used_volume.ml(), 1100);
        assert!(!outcome.has_warnings());
    }

    #[test]
    fn test_rollover_crosses_multiple_lots() {
        // 4 large pours = 2000ml against 200ml open + 3 kegs.
        let p = product(3, 200, 800);
        let outcome = apply_transaction(&[p], &sale(vec![pour(SizeVariant::Large, 4)]));

        let update = &outcome.updates[0];
        // 3200 available - 2000 = 1200 left = 1 keg + 200ml open.
        assert_eq!(update.total_lots, 1);
        assert_eq!(update.remaining_volume.ml(), 200);
        assert_eq!(update.total_used_volume.ml(), 2800);
    }

    #[test]
    fn test_exact_boundary_keeps_invariant() {
        // Consuming exactly the open remainder leaves remaining = 0,
        // never remaining = lot_volume.
        let mut p = product(2, 250, 750);
        let outcome = apply_transaction(&[p.clone()], &sale(vec![pour(SizeVariant::Small, 1)]));

        let update = &outcome.updates[0];
        assert_eq!(update.total_lots, 2);
        assert_eq!(update.remaining_volume.ml(), 0);

        // Draining everything to zero is not an oversell.
        p.stock.total_lots = 0;
        p.stock.remaining_volume = Volume::from_ml(250);
        let outcome = apply_transaction(&[p], &sale(vec![pour(SizeVariant::Small, 1)]));
        assert_eq!(outcome.updates[0].total_lots, 0);
        assert_eq!(outcome.updates[0].remaining_volume.ml(), 0);
        assert!(!outcome.has_warnings());
    }

    #[test]
    fn test_oversell_clamps_and_warns() {
        let p = product(0, 0, 2000);
        let outcome = apply_transaction(&[p], &sale(vec![pour(SizeVariant::Medium, 1)]));

        let update = &outcome.updates[0];
        assert_eq!(update.total_lots, 0);
        assert_eq!(update.remaining_volume.ml(), 0);
        // Used volume still grows: the pour physically happened.
        assert_eq!(update.total_used_volume.ml(), 2350);

        assert_eq!(outcome.warnings.len(), 1);
        let warning = &outcome.warnings[0];
        assert_eq!(warning.product_name, "IPA");
        assert_eq!(warning.attempted.ml(), 350);
        assert_eq!(warning.available.ml(), 0);
    }

    #[test]
    fn test_partial_oversell_clamps_and_warns() {
        // 100ml left in the last keg, 350ml poured anyway.
        let p = product(0, 100, 1900);
        let outcome = apply_transaction(&[p], &sale(vec![pour(SizeVariant::Medium, 1)]));

        assert_eq!(outcome.updates[0].total_lots, 0);
        assert_eq!(outcome.updates[0].remaining_volume.ml(), 0);
        assert!(outcome.has_warnings());
    }

    #[test]
    fn test_replay_is_idempotent() {
        // Same prior state + same transaction = same result, twice.
        let p = product(2, 200, 800);
        let tx = sale(vec![pour(SizeVariant::Large, 1)]);

        let first = apply_transaction(std::slice::from_ref(&p), &tx);
        let second = apply_transaction(std::slice::from_ref(&p), &tx);
        assert_eq!(first, second);
    }

    #[test]
    fn test_untracked_items_are_skipped() {
        let p = product(2, 200, 800);

        let unknown_product = LineItem {
            product: "Lemonade".to_string(),
            size: Some(SizeVariant::Small),
            quantity: 2,
            unit_price: Money::from_yen(400),
        };
        let sizeless = LineItem {
            product: "IPA".to_string(),
            size: None,
            quantity: 1,
            unit_price: Money::from_yen(700),
        };

        let outcome = apply_transaction(&[p], &sale(vec![unknown_product, sizeless]));
        assert!(outcome.updates.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_multiple_items_same_product_aggregate() {
        // 2 × 250ml + 1 × 500ml = 1000ml consumed in one transaction.
        let p = product(2, 200, 800);
        let outcome = apply_transaction(
            &[p],
            &sale(vec![pour(SizeVariant::Small, 2), pour(SizeVariant::Large, 1)]),
        );

        let update = &outcome.updates[0];
        // 2200 - 1000 = 1200 = 1 keg + 200ml.
        assert_eq!(update.total_lots, 1);
        assert_eq!(update.remaining_volume.ml(), 200);
        assert_eq!(update.total_used_volume.ml(), 1800);
    }

    #[test]
    fn test_consumed_cost_prorates_open_lot() {
        let p = product(2, 200, 800);
        let update = StockUpdate {
            product_name: "IPA".to_string(),
            total_lots: 1,
            remaining_volume: Volume::from_ml(900),
            total_used_volume: Volume::from_ml(1300),
        };

        // 500ml at ¥8000 per 1000ml keg = ¥4000.
        assert_eq!(consumed_cost(&p, &update).yen(), 4000);
    }
}
