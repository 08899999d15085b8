//! Stock movement rules
//!
//! A movement is a signed quantity applied to one item, optionally carrying
//! the price the goods were bought at. Whether a decrement may take stock
//! below zero is decided by [`NegativeStockPolicy`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// What to do when a movement would leave stock below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeStockPolicy {
    /// Backorders are allowed; stock may go negative
    #[default]
    Allow,
    /// The movement fails with [`StockError::Insufficient`]
    Reject,
}

impl NegativeStockPolicy {
    /// Stock after applying `movement` to `current`
    pub fn apply(&self, current: Decimal, movement: &StockMovement) -> Result<Decimal, StockError> {
        let delta = movement.delta;
        let updated = current + delta;
        if *self == NegativeStockPolicy::Reject && delta < Decimal::ZERO && updated < Decimal::ZERO
        {
            return Err(StockError::Insufficient {
                item_id: movement.item_id,
                available: current,
                requested: -delta,
            });
        }
        Ok(updated)
    }
}

impl fmt::Display for NegativeStockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegativeStockPolicy::Allow => f.write_str("allow"),
            NegativeStockPolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for NegativeStockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(NegativeStockPolicy::Allow),
            "reject" => Ok(NegativeStockPolicy::Reject),
            other => Err(format!("unknown negative stock policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("insufficient stock for {item_id}: {available} available, {requested} requested")]
    Insufficient {
        item_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },
}

/// A single signed change to an item's stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub item_id: Uuid,
    pub delta: Decimal,
    /// Overwrites the item's buy price when present
    pub buy_price: Option<Decimal>,
}

impl StockMovement {
    /// Goods coming in at the given price
    pub fn inbound(item_id: Uuid, quantity: Decimal, buy_price: Decimal) -> Self {
        Self {
            item_id,
            delta: quantity,
            buy_price: Some(buy_price),
        }
    }

    /// Goods going out; the buy price is left alone
    pub fn outbound(item_id: Uuid, quantity: Decimal) -> Self {
        Self {
            item_id,
            delta: -quantity,
            buy_price: None,
        }
    }

    /// Goods produced in-house
    pub fn produced(item_id: Uuid, quantity: Decimal) -> Self {
        Self {
            item_id,
            delta: quantity,
            buy_price: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.delta.is_zero() && self.buy_price.is_none()
    }
}

/// One movement per item, ordered by item id.
///
/// Deltas for the same item are summed and the last buy price wins, which is
/// what applying the lines one by one would leave behind. Applying items in a
/// fixed order means two transactions touching the same items take their row
/// locks in the same order.
pub fn consolidate(movements: &[StockMovement]) -> Vec<StockMovement> {
    let mut merged: BTreeMap<Uuid, StockMovement> = BTreeMap::new();
    for m in movements {
        merged
            .entry(m.item_id)
            .and_modify(|acc| {
                acc.delta += m.delta;
                if m.buy_price.is_some() {
                    acc.buy_price = m.buy_price;
                }
            })
            .or_insert_with(|| m.clone());
    }
    merged.into_values().collect()
}

/// An item is low on stock once it reaches its threshold
pub fn is_low_stock(stock: Decimal, threshold: Decimal) -> bool {
    stock <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn change(delta: Decimal) -> StockMovement {
        StockMovement {
            item_id: Uuid::nil(),
            delta,
            buy_price: None,
        }
    }

    #[test]
    fn test_allow_policy_goes_negative() {
        let stock = NegativeStockPolicy::Allow
            .apply(dec!(1), &change(dec!(-3)))
            .unwrap();
        assert_eq!(stock, dec!(-2));
    }

    #[test]
    fn test_reject_policy_blocks_negative() {
        let id = Uuid::new_v4();
        let err = NegativeStockPolicy::Reject
            .apply(dec!(1), &StockMovement::outbound(id, dec!(3)))
            .unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                item_id: id,
                available: dec!(1),
                requested: dec!(3),
            }
        );
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_reject_policy_allows_exact_depletion() {
        let stock = NegativeStockPolicy::Reject
            .apply(dec!(3), &change(dec!(-3)))
            .unwrap();
        assert_eq!(stock, Decimal::ZERO);
    }

    #[test]
    fn test_reject_policy_allows_increments_on_negative_stock() {
        let stock = NegativeStockPolicy::Reject
            .apply(dec!(-5), &change(dec!(2)))
            .unwrap();
        assert_eq!(stock, dec!(-3));
    }

    #[test]
    fn test_consolidate_sorts_and_merges() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let movements = vec![
            StockMovement::inbound(high, dec!(4), dec!(10)),
            StockMovement::outbound(low, dec!(1)),
            StockMovement::inbound(high, dec!(3), dec!(11)),
            StockMovement::outbound(low, dec!(2)),
        ];

        let merged = consolidate(&movements);
        assert_eq!(
            merged,
            vec![
                StockMovement {
                    item_id: low,
                    delta: dec!(-3),
                    buy_price: None,
                },
                StockMovement {
                    item_id: high,
                    delta: dec!(7),
                    buy_price: Some(dec!(11)),
                },
            ]
        );
    }

    #[test]
    fn test_consolidate_keeps_earlier_price_when_later_line_has_none() {
        let id = Uuid::new_v4();
        let merged = consolidate(&[
            StockMovement::inbound(id, dec!(5), dec!(2.50)),
            StockMovement::produced(id, dec!(1)),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].delta, dec!(6));
        assert_eq!(merged[0].buy_price, Some(dec!(2.50)));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "Reject".parse::<NegativeStockPolicy>().unwrap(),
            NegativeStockPolicy::Reject
        );
        assert!("sometimes".parse::<NegativeStockPolicy>().is_err());
    }

    #[test]
    fn test_movements() {
        let id = Uuid::new_v4();
        let m = StockMovement::outbound(id, dec!(2));
        assert_eq!(m.delta, dec!(-2));
        assert!(m.buy_price.is_none());

        let m = StockMovement::inbound(id, dec!(7), dec!(12.50));
        assert_eq!(m.delta, dec!(7));
        assert_eq!(m.buy_price, Some(dec!(12.50)));
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        assert!(is_low_stock(dec!(5), dec!(5)));
        assert!(is_low_stock(dec!(4), dec!(5)));
        assert!(!is_low_stock(dec!(6), dec!(5)));
    }
}
