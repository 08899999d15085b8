//! Stock ledger: applies stock movements to items inside a caller's transaction

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppResult;
use shared::{consolidate, NegativeStockPolicy, StockMovement};

/// Non-fatal problem reported alongside a successful document operation
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub code: &'static str,
    pub item_id: Uuid,
    pub message: String,
}

impl Warning {
    pub fn dangling_item(item_id: Uuid) -> Self {
        Self {
            code: "DanglingItemReference",
            item_id,
            message: format!("Item {} no longer exists; line skipped", item_id),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StockLedger {
    policy: NegativeStockPolicy,
}

impl StockLedger {
    pub fn new(policy: NegativeStockPolicy) -> Self {
        Self { policy }
    }

    /// Apply one movement. Returns the new stock, or a warning when the item
    /// no longer exists.
    pub async fn adjust(
        &self,
        conn: &mut PgConnection,
        movement: &StockMovement,
    ) -> AppResult<Result<Decimal, Warning>> {
        let guarded = self.policy == NegativeStockPolicy::Reject && movement.delta < Decimal::ZERO;

        let updated = if movement.is_noop() {
            sqlx::query_scalar::<_, Decimal>("SELECT stock FROM items WHERE id = $1")
                .bind(movement.item_id)
                .fetch_optional(&mut *conn)
                .await?
        } else if guarded {
            self.adjust_checked(conn, movement).await?
        } else {
            sqlx::query_scalar::<_, Decimal>(
                r#"
                UPDATE items
                SET stock = stock + $2,
                    buy_price = COALESCE($3, buy_price),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING stock
                "#,
            )
            .bind(movement.item_id)
            .bind(movement.delta)
            .bind(movement.buy_price)
            .fetch_optional(&mut *conn)
            .await?
        };

        match updated {
            Some(stock) => {
                tracing::debug!(
                    item_id = %movement.item_id,
                    delta = %movement.delta,
                    stock = %stock,
                    "stock adjusted"
                );
                Ok(Ok(stock))
            }
            None => {
                tracing::warn!(item_id = %movement.item_id, "dangling item reference, line skipped");
                Ok(Err(Warning::dangling_item(movement.item_id)))
            }
        }
    }

    /// Lock the row, check the policy, then write
    async fn adjust_checked(
        &self,
        conn: &mut PgConnection,
        movement: &StockMovement,
    ) -> AppResult<Option<Decimal>> {
        let current =
            sqlx::query_scalar::<_, Decimal>("SELECT stock FROM items WHERE id = $1 FOR UPDATE")
                .bind(movement.item_id)
                .fetch_optional(&mut *conn)
                .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let stock = self.policy.apply(current, movement)?;

        sqlx::query(
            r#"
            UPDATE items
            SET stock = $2,
                buy_price = COALESCE($3, buy_price),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(movement.item_id)
        .bind(stock)
        .bind(movement.buy_price)
        .execute(&mut *conn)
        .await?;

        Ok(Some(stock))
    }

    /// Apply every movement, one per item in item id order, collecting
    /// warnings for dangling items
    pub async fn apply_all(
        &self,
        conn: &mut PgConnection,
        movements: &[StockMovement],
    ) -> AppResult<Vec<Warning>> {
        let mut warnings = Vec::new();
        for movement in consolidate(movements) {
            if let Err(warning) = self.adjust(conn, &movement).await? {
                warnings.push(warning);
            }
        }
        Ok(warnings)
    }
}
