//! Stock movement tests
//!
//! - A bill decrements stock per line; a purchase increments it and
//!   refreshes the buy price
//! - The negative stock policy decides whether stock may drop below zero
//! - A completed production batch credits its target item once
//! - Movements are merged per item and applied in item id order

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use shared::{
    completion_movement, consolidate, is_low_stock, produced_quantity, purchase_movements, sale_movements,
    LineItem, NegativeStockPolicy, StockError, StockMovement,
};
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory stand-in for the items table: (stock, buy_price) per item
#[derive(Default)]
struct Shelf {
    items: HashMap<Uuid, (Decimal, Decimal)>,
}

impl Shelf {
    fn stock(&self, id: Uuid) -> Decimal {
        self.items.get(&id).map(|(s, _)| *s).unwrap_or_default()
    }

    fn buy_price(&self, id: Uuid) -> Decimal {
        self.items.get(&id).map(|(_, p)| *p).unwrap_or_default()
    }

    /// Applies every movement or none, like the ledger's transaction
    fn apply_all(
        &mut self,
        policy: NegativeStockPolicy,
        movements: &[StockMovement],
    ) -> Result<(), StockError> {
        let mut staged = self.items.clone();
        for m in consolidate(movements) {
            let entry = staged.entry(m.item_id).or_default();
            entry.0 = policy.apply(entry.0, &m)?;
            if let Some(price) = m.buy_price {
                entry.1 = price;
            }
        }
        self.items = staged;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_bill_decrements_stock() {
        // Bill with lines A×2 and B×1
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut shelf = Shelf::default();
        shelf.items.insert(a, (dec("10"), dec("3")));
        shelf.items.insert(b, (dec("5"), dec("7")));

        let lines = vec![
            LineItem::new(a, dec("2"), dec("4.00")),
            LineItem::new(b, dec("1"), dec("9.50")),
        ];
        shelf
            .apply_all(NegativeStockPolicy::Allow, &sale_movements(&lines))
            .unwrap();

        assert_eq!(shelf.stock(a), dec("8"));
        assert_eq!(shelf.stock(b), dec("4"));
        // Sales never touch the buy price
        assert_eq!(shelf.buy_price(a), dec("3"));
    }

    #[test]
    fn test_purchase_increments_and_reprices() {
        let a = Uuid::new_v4();
        let mut shelf = Shelf::default();
        shelf.items.insert(a, (dec("1"), dec("3.00")));

        let lines = vec![LineItem::new(a, dec("12"), dec("3.25"))];
        shelf
            .apply_all(NegativeStockPolicy::Reject, &purchase_movements(&lines))
            .unwrap();

        assert_eq!(shelf.stock(a), dec("13"));
        assert_eq!(shelf.buy_price(a), dec("3.25"));
    }

    #[test]
    fn test_allow_policy_goes_negative() {
        let sale = StockMovement::outbound(Uuid::new_v4(), dec("3"));
        let result = NegativeStockPolicy::Allow.apply(dec("1"), &sale);
        assert_eq!(result.unwrap(), dec("-2"));
    }

    #[test]
    fn test_reject_policy_refuses_oversell() {
        let id = Uuid::new_v4();
        let err = NegativeStockPolicy::Reject
            .apply(dec("1"), &StockMovement::outbound(id, dec("3")))
            .unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                item_id: id,
                available: dec("1"),
                requested: dec("3"),
            }
        );
    }

    #[test]
    fn test_reject_policy_ignores_increments() {
        // Already negative stock may still be topped up
        let topup = StockMovement::produced(Uuid::new_v4(), dec("2"));
        let result = NegativeStockPolicy::Reject.apply(dec("-5"), &topup);
        assert_eq!(result.unwrap(), dec("-3"));
    }

    #[test]
    fn test_reversed_lines_lock_in_same_order() {
        // Bills [A, B] and [B, A] must touch rows in the same order
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let forward = sale_movements(&[
            LineItem::new(a, dec("1"), dec("1")),
            LineItem::new(b, dec("1"), dec("1")),
        ]);
        let reverse = sale_movements(&[
            LineItem::new(b, dec("1"), dec("1")),
            LineItem::new(a, dec("1"), dec("1")),
        ]);

        let order = |ms: &[StockMovement]| -> Vec<Uuid> {
            consolidate(ms).iter().map(|m| m.item_id).collect()
        };
        assert_eq!(order(&forward), order(&reverse));
    }

    #[test]
    fn test_duplicate_lines_are_checked_as_one() {
        // Two lines of 3 against stock 5 fail together under the reject policy
        let a = Uuid::new_v4();
        let mut shelf = Shelf::default();
        shelf.items.insert(a, (dec("5"), dec("1")));

        let lines = vec![
            LineItem::new(a, dec("3"), dec("1")),
            LineItem::new(a, dec("3"), dec("1")),
        ];
        let err = shelf
            .apply_all(NegativeStockPolicy::Reject, &sale_movements(&lines))
            .unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                item_id: a,
                available: dec("5"),
                requested: dec("6"),
            }
        );
        assert_eq!(shelf.stock(a), dec("5"));
    }

    #[test]
    fn test_rejected_bill_leaves_every_line_untouched() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut shelf = Shelf::default();
        shelf.items.insert(a, (dec("10"), dec("1")));
        shelf.items.insert(b, (dec("0"), dec("1")));

        let lines = vec![
            LineItem::new(a, dec("2"), dec("1")),
            LineItem::new(b, dec("1"), dec("1")),
        ];
        assert!(shelf
            .apply_all(NegativeStockPolicy::Reject, &sale_movements(&lines))
            .is_err());
        assert_eq!(shelf.stock(a), dec("10"));
        assert_eq!(shelf.stock(b), dec("0"));
    }

    #[test]
    fn test_production_completion() {
        let target = Uuid::new_v4();
        let mut shelf = Shelf::default();
        shelf.items.insert(target, (dec("5"), dec("2")));

        let qty = produced_quantity(dec("50"), Some(dec("48")));
        let movement = completion_movement(target, qty).unwrap();
        shelf
            .apply_all(NegativeStockPolicy::Reject, &[movement])
            .unwrap();

        assert_eq!(shelf.stock(target), dec("53"));
        assert_eq!(shelf.buy_price(target), dec("2"));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "reject".parse::<NegativeStockPolicy>().unwrap(),
            NegativeStockPolicy::Reject
        );
        assert_eq!(
            "ALLOW".parse::<NegativeStockPolicy>().unwrap(),
            NegativeStockPolicy::Allow
        );
        assert!("sometimes".parse::<NegativeStockPolicy>().is_err());
        assert_eq!(NegativeStockPolicy::default(), NegativeStockPolicy::Allow);
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        assert!(is_low_stock(dec("5"), dec("5")));
        assert!(is_low_stock(dec("-1"), dec("0")));
        assert!(!is_low_stock(dec("6"), dec("5")));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Under the reject policy stock never ends below zero
    #[test]
    fn prop_reject_never_negative(
        start in 0i64..1000,
        deltas in prop::collection::vec(-200i64..200, 1..30),
    ) {
        let mut stock = Decimal::from(start);
        for delta in deltas {
            let movement = StockMovement {
                item_id: Uuid::nil(),
                delta: Decimal::from(delta),
                buy_price: None,
            };
            if let Ok(next) = NegativeStockPolicy::Reject.apply(stock, &movement) {
                stock = next;
            }
            prop_assert!(stock >= Decimal::ZERO);
        }
    }

    /// A sale followed by a purchase of the same lines restores stock
    #[test]
    fn prop_sale_then_purchase_restores_stock(
        start in 0i64..1000,
        quantities in prop::collection::vec(1i64..50, 1..8),
    ) {
        let mut shelf = Shelf::default();
        let lines: Vec<LineItem> = quantities
            .iter()
            .map(|q| {
                let id = Uuid::new_v4();
                shelf.items.insert(id, (Decimal::from(start), Decimal::ONE));
                LineItem::new(id, Decimal::from(*q), Decimal::ONE)
            })
            .collect();

        shelf.apply_all(NegativeStockPolicy::Allow, &sale_movements(&lines)).unwrap();
        shelf.apply_all(NegativeStockPolicy::Allow, &purchase_movements(&lines)).unwrap();

        for line in &lines {
            prop_assert_eq!(shelf.stock(line.item_id), Decimal::from(start));
        }
    }

    /// Merging keeps each item's net change and yields ascending item ids
    #[test]
    fn prop_consolidate_preserves_net_change(
        picks in prop::collection::vec((0usize..4, -50i64..50), 0..20),
    ) {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let movements: Vec<StockMovement> = picks
            .iter()
            .map(|(i, d)| StockMovement {
                item_id: ids[*i],
                delta: Decimal::from(*d),
                buy_price: None,
            })
            .collect();

        let merged = consolidate(&movements);
        prop_assert!(merged.windows(2).all(|w| w[0].item_id < w[1].item_id));
        for m in &merged {
            let net: Decimal = movements
                .iter()
                .filter(|x| x.item_id == m.item_id)
                .map(|x| x.delta)
                .sum();
            prop_assert_eq!(m.delta, net);
        }
    }
}
