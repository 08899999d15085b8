//! Purchase order service

use chrono::{DateTime, NaiveDate, Utc};
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
    apply_transition, validate_tax_rate, DocumentFamily, DocumentTotals, LineItem,
    PaginatedResponse, PurchaseOrderLine, PurchaseOrderStatus, StatusMachine,
};

const SELECT_PURCHASE_ORDER: &str = r#"
    SELECT d.id, d.number, d.status, d.supplier_id, c.name AS supplier_name, d.lines,
           d.total_amount, d.tax_rate, d.tax_amount, d.grand_total, d.expected_date, d.notes,
           d.created_by AS created_by_id, d.created_at, d.updated_at
    FROM purchase_orders d
    LEFT JOIN contacts c ON c.id = d.supplier_id
"#;

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
    sequences: SequenceService,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub number: String,
    pub status: String,
    pub supplier_id: Uuid,
    pub supplier_name: Option<String>,
    pub lines: Json<Vec<PurchaseOrderLine>>,
    pub total_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub lines: Vec<LineItem>,
    pub tax_rate: Option<Decimal>,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// An open order as shown when preparing a goods receipt
#[derive(Debug, Clone, Serialize)]
pub struct PendingPurchaseOrder {
    pub id: Uuid,
    pub number: String,
    pub status: String,
    pub supplier_id: Uuid,
    pub supplier_name: Option<String>,
    pub lines: Vec<PendingLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub received_qty: Decimal,
    pub remaining: Decimal,
    pub unit_price: Decimal,
}

impl From<PurchaseOrder> for PendingPurchaseOrder {
    fn from(po: PurchaseOrder) -> Self {
        Self {
            lines: po
                .lines
                .0
                .iter()
                .map(|l| PendingLine {
                    item_id: l.item_id,
                    quantity: l.quantity,
                    received_qty: l.received_qty,
                    remaining: l.remaining(),
                    unit_price: l.unit_price,
                })
                .collect(),
            id: po.id,
            number: po.number,
            status: po.status,
            supplier_id: po.supplier_id,
            supplier_name: po.supplier_name,
        }
    }
}

impl PurchaseOrderService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            db,
        }
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<PaginatedResponse<PurchaseOrder>> {
        check_status_filter::<PurchaseOrderStatus>(filter)?;
        list_documents(
            &self.db,
            SELECT_PURCHASE_ORDER,
            "purchase_orders",
            Some("supplier_id"),
            filter,
        )
        .await
    }

    async fn fetch(&self, id: Uuid) -> AppResult<PurchaseOrder> {
        sqlx::query_as::<_, PurchaseOrder>(&format!("{} WHERE d.id = $1", SELECT_PURCHASE_ORDER))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DocumentDetail<PurchaseOrder>> {
        let po = self.fetch(id).await?;
        let lines = po.lines.0.clone();
        let created_by = po.created_by_id;
        expand(&self.db, po, &lines, created_by).await
    }

    pub async fn create(
        &self,
        input: CreatePurchaseOrderInput,
        user_id: Uuid,
    ) -> AppResult<DocumentDetail<PurchaseOrder>> {
        input
            .validate()
            .map_err(|e| AppError::validation("lines", e.to_string()))?;
        let supplier_id = input
            .supplier_id
            .ok_or_else(|| AppError::validation("supplier_id", "Supplier is required"))?;
        check_lines(DocumentFamily::PurchaseOrder, &input.lines)?;
        if let Some(rate) = input.tax_rate {
            validate_tax_rate(rate).map_err(|m| AppError::validation("tax_rate", m))?;
        }

        ensure_contact(&self.db, "supplier_id", supplier_id).await?;

        let lines: Vec<PurchaseOrderLine> = input
            .lines
            .iter()
            .map(|l| PurchaseOrderLine {
                item_id: l.item_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                subtotal: l.subtotal,
                received_qty: Decimal::ZERO,
            })
            .collect();
        let totals = DocumentTotals::compute(&lines, input.tax_rate);

        let (id, number) = self
            .sequences
            .create_numbered(DocumentFamily::PurchaseOrder, |number| {
                self.insert(number, supplier_id, &lines, &totals, &input, user_id)
            })
            .await?;

        tracing::info!(id = %id, number = %number, "purchase order created");

        self.get(id).await
    }

    async fn insert(
        &self,
        number: String,
        supplier_id: Uuid,
        lines: &[PurchaseOrderLine],
        totals: &DocumentTotals,
        input: &CreatePurchaseOrderInput,
        user_id: Uuid,
    ) -> AppResult<(Uuid, String)> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_orders (
                number, status, supplier_id, lines, total_amount, tax_rate, tax_amount,
                grand_total, expected_date, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(PurchaseOrderStatus::initial().as_str())
        .bind(supplier_id)
        .bind(Json(lines))
        .bind(totals.total_amount)
        .bind(totals.tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.grand_total)
        .bind(input.expected_date)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok((id, number))
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> AppResult<DocumentDetail<PurchaseOrder>> {
        let to = parse_status::<PurchaseOrderStatus>(&update.status)?;

        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM purchase_orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let mut status = parse_status::<PurchaseOrderStatus>(&current)?;
        let from = apply_transition(&mut status, to)?;

        sqlx::query("UPDATE purchase_orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, from = %from, to = %status, "purchase order status changed");

        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM purchase_orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        ensure_deletable(parse_status::<PurchaseOrderStatus>(&current)?)?;

        sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, "purchase order deleted");
        Ok(())
    }

    /// Orders goods can still be received against, with outstanding quantities
    pub async fn pending(&self) -> AppResult<Vec<PendingPurchaseOrder>> {
        let receivable: Vec<&str> = PurchaseOrderStatus::ALL
            .iter()
            .filter(|s| s.is_receivable())
            .map(|s| s.as_str())
            .collect();

        let rows = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "{} WHERE d.status = ANY($1) ORDER BY d.created_at",
            SELECT_PURCHASE_ORDER
        ))
        .bind(&receivable)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(PendingPurchaseOrder::from).collect())
    }
}
