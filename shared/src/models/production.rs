//! Production batches

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::stock::StockMovement;

/// Quantity credited to the target item when a batch completes.
///
/// Falls back to the planned quantity when none was reported.
pub fn produced_quantity(planned_qty: Decimal, produced_qty: Option<Decimal>) -> Decimal {
    produced_qty.unwrap_or(planned_qty)
}

/// Movement for a completed batch; nothing when the output is not positive
pub fn completion_movement(target_item_id: Uuid, produced_qty: Decimal) -> Option<StockMovement> {
    (produced_qty > Decimal::ZERO).then(|| StockMovement::produced(target_item_id, produced_qty))
}
