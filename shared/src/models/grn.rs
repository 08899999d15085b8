//! Goods receipt note lines and inspection

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::line::Priced;
use super::purchase_order::ReceiptLine;
use crate::stock::StockMovement;

/// A received line. `accepted_qty` is unset until inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnLine {
    pub item_id: Uuid,
    #[serde(default)]
    pub ordered_qty: Decimal,
    pub received_qty: Decimal,
    #[serde(default)]
    pub accepted_qty: Option<Decimal>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl GrnLine {
    /// Quantity going into stock; uninspected lines accept everything received
    pub fn accepted(&self) -> Decimal {
        self.accepted_qty.unwrap_or(self.received_qty)
    }

    pub fn rejected(&self) -> Decimal {
        self.received_qty - self.accepted()
    }
}

impl Priced for GrnLine {
    fn item_id(&self) -> Uuid {
        self.item_id
    }

    fn quantity(&self) -> Decimal {
        self.received_qty
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn subtotal(&self) -> Decimal {
        self.subtotal
    }
}

/// Accepted quantity recorded for one line during inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInspection {
    /// Position of the line in the GRN
    pub line: usize,
    pub accepted_qty: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectionError {
    #[error("line {0} does not exist")]
    NoSuchLine(usize),

    #[error("line {line}: accepted quantity {accepted} must be between 0 and received quantity {received}")]
    OutOfRange {
        line: usize,
        accepted: Decimal,
        received: Decimal,
    },
}

/// Record accepted quantities. Either every inspection applies or none do.
pub fn inspect(lines: &mut [GrnLine], inspections: &[LineInspection]) -> Result<(), InspectionError> {
    for inspection in inspections {
        let line = lines
            .get(inspection.line)
            .ok_or(InspectionError::NoSuchLine(inspection.line))?;
        if inspection.accepted_qty < Decimal::ZERO || inspection.accepted_qty > line.received_qty {
            return Err(InspectionError::OutOfRange {
                line: inspection.line,
                accepted: inspection.accepted_qty,
                received: line.received_qty,
            });
        }
    }

    for inspection in inspections {
        lines[inspection.line].accepted_qty = Some(inspection.accepted_qty);
    }
    Ok(())
}

/// One inbound movement per line: accepted quantity at the line's price
pub fn stock_movements(lines: &[GrnLine]) -> Vec<StockMovement> {
    lines
        .iter()
        .map(|l| StockMovement::inbound(l.item_id, l.accepted(), l.unit_price))
        .collect()
}

/// Accepted quantities to credit against the originating purchase order
pub fn receipt_lines(lines: &[GrnLine]) -> Vec<ReceiptLine> {
    lines
        .iter()
        .map(|l| ReceiptLine {
            item_id: l.item_id,
            accepted_qty: l.accepted(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn grn_line(received: Decimal) -> GrnLine {
        GrnLine {
            item_id: Uuid::new_v4(),
            ordered_qty: dec!(10),
            received_qty: received,
            accepted_qty: None,
            unit_price: dec!(4.5),
            subtotal: received * dec!(4.5),
        }
    }

    #[test]
    fn test_uninspected_line_accepts_received() {
        let line = grn_line(dec!(8));
        assert_eq!(line.accepted(), dec!(8));
        assert_eq!(line.rejected(), Decimal::ZERO);
    }

    #[test]
    fn test_inspect_sets_accepted() {
        let mut lines = vec![grn_line(dec!(10)), grn_line(dec!(4))];
        inspect(
            &mut lines,
            &[LineInspection {
                line: 0,
                accepted_qty: dec!(7),
            }],
        )
        .unwrap();
        assert_eq!(lines[0].accepted(), dec!(7));
        assert_eq!(lines[0].rejected(), dec!(3));
        assert_eq!(lines[1].accepted(), dec!(4));
    }

    #[test]
    fn test_inspect_rejects_over_acceptance_atomically() {
        let mut lines = vec![grn_line(dec!(10)), grn_line(dec!(4))];
        let result = inspect(
            &mut lines,
            &[
                LineInspection {
                    line: 0,
                    accepted_qty: dec!(7),
                },
                LineInspection {
                    line: 1,
                    accepted_qty: dec!(5),
                },
            ],
        );
        assert!(matches!(result, Err(InspectionError::OutOfRange { line: 1, .. })));
        assert_eq!(lines[0].accepted_qty, None);
    }

    #[test]
    fn test_inspect_unknown_line() {
        let mut lines = vec![grn_line(dec!(1))];
        let result = inspect(
            &mut lines,
            &[LineInspection {
                line: 3,
                accepted_qty: dec!(1),
            }],
        );
        assert_eq!(result, Err(InspectionError::NoSuchLine(3)));
    }

    #[test]
    fn test_movements_carry_price() {
        let mut lines = vec![grn_line(dec!(10))];
        lines[0].accepted_qty = Some(dec!(7));
        let movements = stock_movements(&lines);
        assert_eq!(movements[0].delta, dec!(7));
        assert_eq!(movements[0].buy_price, Some(dec!(4.5)));
        assert_eq!(receipt_lines(&lines)[0].accepted_qty, dec!(7));
    }
}
