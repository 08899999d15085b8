//! Purchase order lines and goods receipt matching

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::line::Priced;
use crate::status::{PurchaseOrderStatus, StatusMachine, TransitionError};

/// An ordered line with the quantity received against it so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    #[serde(default)]
    pub received_qty: Decimal,
}

impl PurchaseOrderLine {
    /// Quantity still outstanding; never negative
    pub fn remaining(&self) -> Decimal {
        (self.quantity - self.received_qty).max(Decimal::ZERO)
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_qty >= self.quantity
    }
}

impl Priced for PurchaseOrderLine {
    fn item_id(&self) -> Uuid {
        self.item_id
    }

    fn quantity(&self) -> Decimal {
        self.quantity
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn subtotal(&self) -> Decimal {
        self.subtotal
    }
}

/// Quantity of an item accepted into stock by a goods receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub item_id: Uuid,
    pub accepted_qty: Decimal,
}

/// Add accepted quantities to the order's lines, matching by item.
///
/// A receipt goes to the first line of the same item that is still
/// outstanding, or to the first line of that item when all are complete
/// (over-receipt). Receipts for items the order does not contain are
/// returned untouched.
pub fn apply_receipt(lines: &mut [PurchaseOrderLine], receipts: &[ReceiptLine]) -> Vec<ReceiptLine> {
    let mut unmatched = Vec::new();

    for receipt in receipts {
        if receipt.accepted_qty.is_zero() {
            continue;
        }

        let target = lines
            .iter()
            .position(|l| l.item_id == receipt.item_id && !l.remaining().is_zero())
            .or_else(|| lines.iter().position(|l| l.item_id == receipt.item_id));

        match target {
            Some(index) => lines[index].received_qty += receipt.accepted_qty,
            None => unmatched.push(*receipt),
        }
    }

    unmatched
}

/// Status an order should carry given how much of it has been received
pub fn receipt_status(lines: &[PurchaseOrderLine]) -> PurchaseOrderStatus {
    if !lines.is_empty() && lines.iter().all(PurchaseOrderLine::is_fully_received) {
        PurchaseOrderStatus::Completed
    } else {
        PurchaseOrderStatus::Partial
    }
}

/// Status change implied by a receipt, if any.
///
/// Returns `Ok(None)` when the order already carries the recomputed status.
pub fn status_after_receipt(
    current: PurchaseOrderStatus,
    lines: &[PurchaseOrderLine],
) -> Result<Option<PurchaseOrderStatus>, TransitionError> {
    let target = receipt_status(lines);
    if target == current {
        return Ok(None);
    }
    if !current.can_transition_to(target) {
        return Err(TransitionError {
            family: PurchaseOrderStatus::FAMILY,
            from: current.as_str().to_string(),
            to: target.as_str().to_string(),
        });
    }
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn po_line(item_id: Uuid, quantity: Decimal) -> PurchaseOrderLine {
        PurchaseOrderLine {
            item_id,
            quantity,
            unit_price: dec!(10),
            subtotal: quantity * dec!(10),
            received_qty: Decimal::ZERO,
        }
    }

    #[test]
    fn test_partial_then_complete() {
        let item = Uuid::new_v4();
        let mut lines = vec![po_line(item, dec!(10))];

        let unmatched = apply_receipt(
            &mut lines,
            &[ReceiptLine {
                item_id: item,
                accepted_qty: dec!(7),
            }],
        );
        assert!(unmatched.is_empty());
        assert_eq!(lines[0].received_qty, dec!(7));
        assert_eq!(
            status_after_receipt(PurchaseOrderStatus::Sent, &lines).unwrap(),
            Some(PurchaseOrderStatus::Partial)
        );

        apply_receipt(
            &mut lines,
            &[ReceiptLine {
                item_id: item,
                accepted_qty: dec!(3),
            }],
        );
        assert_eq!(lines[0].received_qty, dec!(10));
        assert_eq!(
            status_after_receipt(PurchaseOrderStatus::Partial, &lines).unwrap(),
            Some(PurchaseOrderStatus::Completed)
        );
    }

    #[test]
    fn test_partial_stays_partial() {
        let item = Uuid::new_v4();
        let mut lines = vec![po_line(item, dec!(10))];
        lines[0].received_qty = dec!(2);
        assert_eq!(
            status_after_receipt(PurchaseOrderStatus::Partial, &lines).unwrap(),
            None
        );
    }

    #[test]
    fn test_unknown_item_is_unmatched() {
        let mut lines = vec![po_line(Uuid::new_v4(), dec!(5))];
        let stranger = ReceiptLine {
            item_id: Uuid::new_v4(),
            accepted_qty: dec!(1),
        };
        let unmatched = apply_receipt(&mut lines, &[stranger]);
        assert_eq!(unmatched, vec![stranger]);
        assert_eq!(lines[0].received_qty, Decimal::ZERO);
    }

    #[test]
    fn test_receipt_fills_outstanding_line_first() {
        let item = Uuid::new_v4();
        let mut lines = vec![po_line(item, dec!(5)), po_line(item, dec!(5))];
        lines[0].received_qty = dec!(5);

        apply_receipt(
            &mut lines,
            &[ReceiptLine {
                item_id: item,
                accepted_qty: dec!(2),
            }],
        );
        assert_eq!(lines[0].received_qty, dec!(5));
        assert_eq!(lines[1].received_qty, dec!(2));
    }

    #[test]
    fn test_over_receipt_lands_on_first_line() {
        let item = Uuid::new_v4();
        let mut lines = vec![po_line(item, dec!(5))];
        lines[0].received_qty = dec!(5);

        apply_receipt(
            &mut lines,
            &[ReceiptLine {
                item_id: item,
                accepted_qty: dec!(1),
            }],
        );
        assert_eq!(lines[0].received_qty, dec!(6));
        assert_eq!(lines[0].remaining(), Decimal::ZERO);
        assert_eq!(receipt_status(&lines), PurchaseOrderStatus::Completed);
    }

    #[test]
    fn test_receipt_on_closed_order_is_rejected() {
        let item = Uuid::new_v4();
        let lines = vec![po_line(item, dec!(5))];
        assert!(status_after_receipt(PurchaseOrderStatus::Cancelled, &lines).is_err());
    }
}
