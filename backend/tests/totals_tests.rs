//! Document totals and line validation tests
//!
//! - total = Σ subtotal, tax = total × rate / 100, grand = total + tax
//! - Subtotals are stored as given; mismatches are reported, not corrected
//! - Lines must have a positive quantity and non-negative prices

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    mismatched_subtotals, validate_lines, validate_tax_rate, DocumentTotals, LineItem,
    Pagination, PurchaseOrderStatus, StatusMachine,
};
use uuid::Uuid;

fn line(quantity: Decimal, unit_price: Decimal) -> LineItem {
    LineItem::new(Uuid::new_v4(), quantity, unit_price)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_totals_with_tax() {
        let lines = vec![line(dec!(2), dec!(10)), line(dec!(3), dec!(5))];
        let totals = DocumentTotals::compute(&lines, Some(dec!(18)));

        assert_eq!(totals.total_amount, dec!(35));
        assert_eq!(totals.tax_amount, dec!(6.30));
        assert_eq!(totals.grand_total, dec!(41.30));
    }

    #[test]
    fn test_totals_without_tax() {
        let lines = vec![line(dec!(1), dec!(99.99))];
        let totals = DocumentTotals::compute(&lines, None);
        assert_eq!(totals.tax_rate, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.grand_total, dec!(99.99));
    }

    #[test]
    fn test_supplied_subtotal_is_kept() {
        let mut odd = line(dec!(2), dec!(10));
        odd.subtotal = dec!(19);
        let lines = vec![line(dec!(1), dec!(1)), odd];

        assert_eq!(mismatched_subtotals(&lines), vec![1]);
        let totals = DocumentTotals::compute(&lines, None);
        assert_eq!(totals.total_amount, dec!(20));
    }

    #[test]
    fn test_line_validation() {
        assert!(validate_lines::<LineItem>(&[]).is_err());

        let lines = vec![line(dec!(1), dec!(1)), line(dec!(0), dec!(1))];
        let (index, _) = validate_lines(&lines).unwrap_err();
        assert_eq!(index, 1);

        let lines = vec![line(dec!(1), dec!(-1))];
        assert!(validate_lines(&lines).is_err());

        // Free goods are fine
        let lines = vec![line(dec!(3), Decimal::ZERO)];
        assert!(validate_lines(&lines).is_ok());
    }

    #[test]
    fn test_tax_rate_bounds() {
        assert!(validate_tax_rate(dec!(0)).is_ok());
        assert!(validate_tax_rate(dec!(100)).is_ok());
        assert!(validate_tax_rate(dec!(-0.01)).is_err());
        assert!(validate_tax_rate(dec!(100.01)).is_err());
    }

    #[test]
    fn test_only_draft_orders_are_deletable() {
        // Orders can be deleted while still in their initial state
        for status in PurchaseOrderStatus::ALL {
            assert_eq!(
                status.is_initial(),
                *status == PurchaseOrderStatus::Draft,
                "{status}"
            );
        }
    }

    #[test]
    fn test_pagination_window() {
        let p = Pagination::from_query(Some(3), Some(25));
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
        assert_eq!(p.meta(51).total_pages, 3);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn line_strategy() -> impl Strategy<Value = LineItem> {
    (1i64..1000, 0i64..100_000).prop_map(|(qty, cents)| {
        line(Decimal::from(qty), Decimal::new(cents, 2))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_totals_are_exact(
        lines in prop::collection::vec(line_strategy(), 1..20),
        rate_bp in 0i64..=10_000,
    ) {
        let rate = Decimal::new(rate_bp, 2);
        let totals = DocumentTotals::compute(&lines, Some(rate));

        let expected: Decimal = lines.iter().map(|l| l.quantity * l.unit_price).sum();
        prop_assert_eq!(totals.total_amount, expected);
        prop_assert_eq!(totals.tax_amount, expected * rate / Decimal::ONE_HUNDRED);
        prop_assert_eq!(totals.grand_total, totals.total_amount + totals.tax_amount);
        prop_assert!(mismatched_subtotals(&lines).is_empty());
    }
}
