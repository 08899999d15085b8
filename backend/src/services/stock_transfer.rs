//! Stock transfer service
//!
//! Transfers record goods moving between locations. They carry no stock
//! side effect: item stock is a single figure, not tracked per location.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::document::{
    check_lines, check_status_filter, ensure_contact, ensure_deletable, expand, list_documents,
    parse_status, DocumentDetail, DocumentFilter, StatusUpdate,
};
use super::sequence::SequenceService;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{
    apply_transition, DocumentFamily, DocumentTotals, LineItem, PaginatedResponse,
    StatusMachine, StockTransferStatus,
};

const SELECT_STOCK_TRANSFER: &str = r#"
    SELECT d.id, d.number, d.status, d.destination_id, c.name AS destination_name,
           d.from_location, d.to_location, d.lines, d.total_amount, d.notes,
           d.created_by AS created_by_id, d.created_at, d.updated_at
    FROM stock_transfers d
    LEFT JOIN contacts c ON c.id = d.destination_id
"#;

#[derive(Clone)]
pub struct StockTransferService {
    db: PgPool,
    sequences: SequenceService,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockTransfer {
    pub id: Uuid,
    pub number: String,
    pub status: String,
    pub destination_id: Uuid,
    pub destination_name: Option<String>,
    pub from_location: String,
    pub to_location: String,
    pub lines: Json<Vec<LineItem>>,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockTransferInput {
    pub destination_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub from_location: String,
    #[validate(length(min = 1, max = 200))]
    pub to_location: String,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
}

impl StockTransferService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            db,
        }
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<PaginatedResponse<StockTransfer>> {
        check_status_filter::<StockTransferStatus>(filter)?;
        list_documents(
            &self.db,
            SELECT_STOCK_TRANSFER,
            "stock_transfers",
            Some("destination_id"),
            filter,
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DocumentDetail<StockTransfer>> {
        let transfer = sqlx::query_as::<_, StockTransfer>(&format!(
            "{} WHERE d.id = $1",
            SELECT_STOCK_TRANSFER
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))?;

        let lines = transfer.lines.0.clone();
        let created_by = transfer.created_by_id;
        expand(&self.db, transfer, &lines, created_by).await
    }

    pub async fn create(
        &self,
        input: CreateStockTransferInput,
        user_id: Uuid,
    ) -> AppResult<DocumentDetail<StockTransfer>> {
        input
            .validate()
            .map_err(|e| AppError::validation("stock_transfer", e.to_string()))?;
        let destination_id = input
            .destination_id
            .ok_or_else(|| AppError::validation("destination_id", "Destination is required"))?;
        check_lines(DocumentFamily::StockTransfer, &input.lines)?;
        ensure_contact(&self.db, "destination_id", destination_id).await?;

        let totals = DocumentTotals::compute(&input.lines, None);

        let id = self
            .sequences
            .create_numbered(DocumentFamily::StockTransfer, |number| {
                let input = &input;
                async move {
                    let id = sqlx::query_scalar::<_, Uuid>(
                        r#"
                        INSERT INTO stock_transfers (
                            number, status, destination_id, from_location, to_location,
                            lines, total_amount, notes, created_by
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                        RETURNING id
                        "#,
                    )
                    .bind(&number)
                    .bind(StockTransferStatus::initial().as_str())
                    .bind(destination_id)
                    .bind(&input.from_location)
                    .bind(&input.to_location)
                    .bind(Json(&input.lines))
                    .bind(totals.total_amount)
                    .bind(&input.notes)
                    .bind(user_id)
                    .fetch_one(&self.db)
                    .await?;
                    tracing::info!(id = %id, number = %number, "stock transfer created");
                    Ok(id)
                }
            })
            .await?;

        self.get(id).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> AppResult<DocumentDetail<StockTransfer>> {
        let to = parse_status::<StockTransferStatus>(&update.status)?;

        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM stock_transfers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))?;

        let mut status = parse_status::<StockTransferStatus>(&current)?;
        let from = apply_transition(&mut status, to)?;

        sqlx::query("UPDATE stock_transfers SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, from = %from, to = %status, "stock transfer status changed");

        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM stock_transfers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))?;

        ensure_deletable(parse_status::<StockTransferStatus>(&current)?)?;

        sqlx::query("DELETE FROM stock_transfers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, "stock transfer deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{item, setup, supplier};
    use rust_decimal_macros::dec;

    #[test]
    #[ignore] // Requires database connection
    fn test_created_transfer_reads_back() {
        tokio_test::block_on(async {
            let (pool, config) = setup().await;
            let transfers = StockTransferService::new(pool.clone(), &config);
            let destination = supplier(&pool).await;
            let flour = item(&pool, dec!(20), dec!(30)).await;
            let user = Uuid::new_v4();

            let created = transfers
                .create(
                    CreateStockTransferInput {
                        destination_id: Some(destination),
                        from_location: "Main store".to_string(),
                        to_location: "Branch 2".to_string(),
                        lines: vec![LineItem::new(flour.id, dec!(4), dec!(30))],
                        notes: Some("Weekend restock".to_string()),
                    },
                    user,
                )
                .await
                .unwrap();
            let fetched = transfers.get(created.document.id).await.unwrap();

            let (a, b) = (&created.document, &fetched.document);
            assert_eq!(a.number, b.number);
            assert_eq!(b.status, "Pending");
            assert_eq!(b.destination_id, destination);
            assert_eq!(b.from_location, "Main store");
            assert_eq!(b.to_location, "Branch 2");
            assert_eq!(b.lines.0, vec![LineItem::new(flour.id, dec!(4), dec!(30))]);
            assert_eq!(b.total_amount, dec!(120));
            assert_eq!(b.created_by_id, user);
            assert!(fetched.items.contains_key(&flour.id));

            // Stock is a single figure per item; transfers leave it alone
            let stock: Decimal = sqlx::query_scalar("SELECT stock FROM items WHERE id = $1")
                .bind(flour.id)
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(stock, dec!(20));
        });
    }

    #[test]
    #[ignore] // Requires database connection
    fn test_transfer_columns_reject_null() {
        tokio_test::block_on(async {
            let (pool, _) = setup().await;
            let nullable: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT column_name::text FROM information_schema.columns
                WHERE table_name = 'stock_transfers'
                  AND column_name IN ('destination_id', 'from_location', 'to_location')
                  AND is_nullable = 'YES'
                "#,
            )
            .fetch_all(&pool)
            .await
            .unwrap();
            assert!(nullable.is_empty(), "nullable columns: {nullable:?}");
        });
    }
}
