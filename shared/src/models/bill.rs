//! Point-of-sale bills and direct purchases

use serde::{Deserialize, Serialize};

use super::line::LineItem;
use crate::stock::StockMovement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Cash,
    Card,
    Upi,
    Credit,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Card => "card",
            PaymentMode::Upi => "upi",
            PaymentMode::Credit => "credit",
        }
    }
}

/// A sale takes every line's quantity out of stock
pub fn sale_movements(lines: &[LineItem]) -> Vec<StockMovement> {
    lines
        .iter()
        .map(|l| StockMovement::outbound(l.item_id, l.quantity))
        .collect()
}

/// A purchase puts every line's quantity into stock at the line's price
pub fn purchase_movements(lines: &[LineItem]) -> Vec<StockMovement> {
    lines
        .iter()
        .map(|l| StockMovement::inbound(l.item_id, l.quantity, l.unit_price))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_sale_decrements_each_line() {
        let a = LineItem::new(Uuid::new_v4(), dec!(2), dec!(10));
        let b = LineItem::new(Uuid::new_v4(), dec!(1), dec!(5));
        let movements = sale_movements(&[a.clone(), b.clone()]);
        assert_eq!(movements[0].item_id, a.item_id);
        assert_eq!(movements[0].delta, dec!(-2));
        assert_eq!(movements[1].delta, dec!(-1));
        assert!(movements.iter().all(|m| m.buy_price.is_none()));
    }

    #[test]
    fn test_purchase_sets_buy_price() {
        let a = LineItem::new(Uuid::new_v4(), dec!(12), dec!(3.25));
        let movements = purchase_movements(&[a]);
        assert_eq!(movements[0].delta, dec!(12));
        assert_eq!(movements[0].buy_price, Some(dec!(3.25)));
    }

    #[test]
    fn test_payment_mode_serde() {
        let mode: PaymentMode = serde_json::from_str("\"upi\"").unwrap();
        assert_eq!(mode, PaymentMode::Upi);
    }
}
