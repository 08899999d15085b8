//! Direct purchases
//!
//! Goods bought without a purchase order. They arrive already received, so
//! creation puts the lines into stock and refreshes each item's buy price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::document::{
    check_lines, ensure_contact, expand, list_documents, DocumentDetail, DocumentFilter,
};
use super::sequence::SequenceService;
use super::stock::StockLedger;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{purchase_movements, DocumentFamily, DocumentTotals, LineItem, PaginatedResponse};

/// Purchases are created received and never change status
pub const PURCHASE_STATUS: &str = "Received";

const SELECT_PURCHASE: &str = r#"
    SELECT d.id, d.number, d.status, d.supplier_id, c.name AS supplier_name,
           d.supplier_invoice_number, d.lines, d.total_amount, d.notes,
           d.created_by AS created_by_id, d.created_at, d.updated_at
    FROM purchases d
    LEFT JOIN contacts c ON c.id = d.supplier_id
"#;

#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
    sequences: SequenceService,
    ledger: StockLedger,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub number: String,
    pub status: String,
    pub supplier_id: Uuid,
    pub supplier_name: Option<String>,
    pub supplier_invoice_number: Option<String>,
    pub lines: Json<Vec<LineItem>>,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseInput {
    pub supplier_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub supplier_invoice_number: Option<String>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
}

impl PurchaseService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            ledger: StockLedger::new(config.inventory.negative_stock),
            db,
        }
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<PaginatedResponse<Purchase>> {
        if let Some(status) = &filter.status {
            if status != PURCHASE_STATUS {
                return Err(AppError::validation(
                    "status",
                    format!("Unknown purchase status: {}", status),
                ));
            }
        }
        list_documents(
            &self.db,
            SELECT_PURCHASE,
            "purchases",
            Some("supplier_id"),
            filter,
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DocumentDetail<Purchase>> {
        let purchase =
            sqlx::query_as::<_, Purchase>(&format!("{} WHERE d.id = $1", SELECT_PURCHASE))
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let lines = purchase.lines.0.clone();
        let created_by = purchase.created_by_id;
        expand(&self.db, purchase, &lines, created_by).await
    }

    pub async fn create(
        &self,
        input: CreatePurchaseInput,
        user_id: Uuid,
    ) -> AppResult<DocumentDetail<Purchase>> {
        input
            .validate()
            .map_err(|e| AppError::validation("purchase", e.to_string()))?;
        let supplier_id = input
            .supplier_id
            .ok_or_else(|| AppError::validation("supplier_id", "Supplier is required"))?;
        check_lines(DocumentFamily::Purchase, &input.lines)?;

        let totals = DocumentTotals::compute(&input.lines, None);
        let movements = purchase_movements(&input.lines);

        let (id, warnings) = self
            .sequences
            .create_numbered(DocumentFamily::Purchase, |number| {
                let input = &input;
                let movements = &movements;
                async move {
                    let mut tx = self.db.begin().await?;

                    ensure_contact(&mut *tx, "supplier_id", supplier_id).await?;

                    let id = sqlx::query_scalar::<_, Uuid>(
                        r#"
                        INSERT INTO purchases (
                            number, status, supplier_id, supplier_invoice_number, lines,
                            total_amount, notes, created_by
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        RETURNING id
                        "#,
                    )
                    .bind(&number)
                    .bind(PURCHASE_STATUS)
                    .bind(supplier_id)
                    .bind(&input.supplier_invoice_number)
                    .bind(Json(&input.lines))
                    .bind(totals.total_amount)
                    .bind(&input.notes)
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;

                    let warnings = self.ledger.apply_all(&mut tx, movements).await?;

                    tx.commit().await?;

                    tracing::info!(
                        id = %id,
                        number = %number,
                        total_amount = %totals.total_amount,
                        "purchase received"
                    );
                    Ok((id, warnings))
                }
            })
            .await?;

        Ok(self.get(id).await?.with_warnings(warnings))
    }
}
