//! Line items and document totals

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anything that carries a quantity, a unit price and a caller-supplied subtotal
pub trait Priced {
    fn item_id(&self) -> Uuid;
    fn quantity(&self) -> Decimal;
    fn unit_price(&self) -> Decimal;
    fn subtotal(&self) -> Decimal;

    /// Whether the supplied subtotal equals `quantity × unit_price`
    fn subtotal_matches(&self) -> bool {
        self.quantity() * self.unit_price() == self.subtotal()
    }
}

/// A plain document line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl LineItem {
    pub fn new(item_id: Uuid, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            item_id,
            quantity,
            unit_price,
            subtotal: quantity * unit_price,
        }
    }
}

impl Priced for LineItem {
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

/// Header totals derived from a document's lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub total_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
}

impl DocumentTotals {
    /// `total = Σ subtotal`, `tax = total × rate / 100`, `grand = total + tax`.
    ///
    /// Subtotals are taken as supplied.
    pub fn compute<L: Priced>(lines: &[L], tax_rate: Option<Decimal>) -> Self {
        let total_amount: Decimal = lines.iter().map(Priced::subtotal).sum();
        let tax_rate = tax_rate.unwrap_or(Decimal::ZERO);
        let tax_amount = total_amount * tax_rate / Decimal::ONE_HUNDRED;

        Self {
            total_amount,
            tax_rate,
            tax_amount,
            grand_total: total_amount + tax_amount,
        }
    }
}

/// Indexes of lines whose subtotal disagrees with `quantity × unit_price`
pub fn mismatched_subtotals<L: Priced>(lines: &[L]) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.subtotal_matches())
        .map(|(i, _)| i)
        .collect()
}
