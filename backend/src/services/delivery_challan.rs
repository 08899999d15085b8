//! Delivery challan service

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
    apply_transition, ChallanStatus, DocumentFamily, DocumentTotals, LineItem, PaginatedResponse,
    StatusMachine,
};

const SELECT_CHALLAN: &str = r#"
    SELECT d.id, d.number, d.status, d.customer_id, c.name AS customer_name, d.lines,
           d.total_amount, d.vehicle_number, d.dispatch_date, d.delivery_date, d.notes,
           d.created_by AS created_by_id, d.created_at, d.updated_at
    FROM delivery_challans d
    LEFT JOIN contacts c ON c.id = d.customer_id
"#;

#[derive(Clone)]
pub struct DeliveryChallanService {
    db: PgPool,
    sequences: SequenceService,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeliveryChallan {
    pub id: Uuid,
    pub number: String,
    pub status: String,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub lines: Json<Vec<LineItem>>,
    pub total_amount: Decimal,
    pub vehicle_number: Option<String>,
    pub dispatch_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallanInput {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub lines: Vec<LineItem>,
    #[validate(length(max = 32))]
    pub vehicle_number: Option<String>,
    pub notes: Option<String>,
}

impl DeliveryChallanService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            db,
        }
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<PaginatedResponse<DeliveryChallan>> {
        check_status_filter::<ChallanStatus>(filter)?;
        list_documents(
            &self.db,
            SELECT_CHALLAN,
            "delivery_challans",
            Some("customer_id"),
            filter,
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DocumentDetail<DeliveryChallan>> {
        let challan =
            sqlx::query_as::<_, DeliveryChallan>(&format!("{} WHERE d.id = $1", SELECT_CHALLAN))
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Delivery challan".to_string()))?;

        let lines = challan.lines.0.clone();
        let created_by = challan.created_by_id;
        expand(&self.db, challan, &lines, created_by).await
    }

    pub async fn create(
        &self,
        input: CreateChallanInput,
        user_id: Uuid,
    ) -> AppResult<DocumentDetail<DeliveryChallan>> {
        input
            .validate()
            .map_err(|e| AppError::validation("delivery_challan", e.to_string()))?;
        let customer_id = input
            .customer_id
            .ok_or_else(|| AppError::validation("customer_id", "Customer is required"))?;
        check_lines(DocumentFamily::DeliveryChallan, &input.lines)?;
        ensure_contact(&self.db, "customer_id", customer_id).await?;

        let totals = DocumentTotals::compute(&input.lines, None);

        let id = self
            .sequences
            .create_numbered(DocumentFamily::DeliveryChallan, |number| {
                let input = &input;
                async move {
                    let id = sqlx::query_scalar::<_, Uuid>(
                        r#"
                        INSERT INTO delivery_challans (
                            number, status, customer_id, lines, total_amount, vehicle_number,
                            notes, created_by
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        RETURNING id
                        "#,
                    )
                    .bind(&number)
                    .bind(ChallanStatus::initial().as_str())
                    .bind(customer_id)
                    .bind(Json(&input.lines))
                    .bind(totals.total_amount)
                    .bind(&input.vehicle_number)
                    .bind(&input.notes)
                    .bind(user_id)
                    .fetch_one(&self.db)
                    .await?;
                    tracing::info!(id = %id, number = %number, "delivery challan created");
                    Ok(id)
                }
            })
            .await?;

        self.get(id).await
    }

    /// Dispatch stamps the dispatch time once; delivery stamps the delivery time
    pub async fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> AppResult<DocumentDetail<DeliveryChallan>> {
        let to = parse_status::<ChallanStatus>(&update.status)?;

        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM delivery_challans WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Delivery challan".to_string()))?;

        let mut status = parse_status::<ChallanStatus>(&current)?;
        let from = apply_transition(&mut status, to)?;

        sqlx::query(
            r#"
            UPDATE delivery_challans
            SET status = $2,
                dispatch_date = CASE
                    WHEN $2 = 'Dispatched' THEN COALESCE(dispatch_date, NOW())
                    ELSE dispatch_date
                END,
                delivery_date = CASE WHEN $2 = 'Delivered' THEN NOW() ELSE delivery_date END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(id = %id, from = %from, to = %status, "delivery challan status changed");

        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM delivery_challans WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Delivery challan".to_string()))?;

        ensure_deletable(parse_status::<ChallanStatus>(&current)?)?;

        sqlx::query("DELETE FROM delivery_challans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, "delivery challan deleted");
        Ok(())
    }
}
