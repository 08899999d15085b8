//! Production batch service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::document::{
    check_status_filter, ensure_deletable, expand, list_documents, parse_status, DocumentDetail,
    DocumentFilter,
};
use super::sequence::SequenceService;
use super::stock::StockLedger;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{
    apply_transition, completion_movement, produced_quantity, validate_lines, validate_quantity,
    DocumentFamily, LineItem, PaginatedResponse, ProductionStatus, StatusMachine,
};

const SELECT_PRODUCTION: &str = r#"
    SELECT d.id, d.number, d.status, d.target_item_id, i.name AS target_item_name,
           d.machine_id, m.name AS machine_name, d.planned_qty, d.produced_qty, d.lines,
           d.start_date, d.notes, d.created_by AS created_by_id, d.completed_at,
           d.created_at, d.updated_at
    FROM productions d
    LEFT JOIN items i ON i.id = d.target_item_id
    LEFT JOIN machines m ON m.id = d.machine_id
"#;

#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
    sequences: SequenceService,
    ledger: StockLedger,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Production {
    pub id: Uuid,
    pub number: String,
    pub status: String,
    pub target_item_id: Uuid,
    pub target_item_name: Option<String>,
    pub machine_id: Option<Uuid>,
    pub machine_name: Option<String>,
    pub planned_qty: Decimal,
    pub produced_qty: Option<Decimal>,
    /// Materials used; informational only
    pub lines: Json<Vec<LineItem>>,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductionInput {
    pub target_item_id: Option<Uuid>,
    pub machine_id: Option<Uuid>,
    pub planned_qty: Decimal,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Status change body; `produced_qty` is read when completing
#[derive(Debug, Deserialize)]
pub struct ProductionStatusUpdate {
    pub status: String,
    pub produced_qty: Option<Decimal>,
}

impl ProductionService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            ledger: StockLedger::new(config.inventory.negative_stock),
            db,
        }
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<PaginatedResponse<Production>> {
        check_status_filter::<ProductionStatus>(filter)?;
        list_documents(&self.db, SELECT_PRODUCTION, "productions", None, filter).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DocumentDetail<Production>> {
        let production =
            sqlx::query_as::<_, Production>(&format!("{} WHERE d.id = $1", SELECT_PRODUCTION))
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Production".to_string()))?;

        let mut lines = production.lines.0.clone();
        lines.push(LineItem::new(
            production.target_item_id,
            production.planned_qty,
            Decimal::ZERO,
        ));
        let created_by = production.created_by_id;
        expand(&self.db, production, &lines, created_by).await
    }

    pub async fn create(
        &self,
        input: CreateProductionInput,
        user_id: Uuid,
    ) -> AppResult<DocumentDetail<Production>> {
        let target_item_id = input
            .target_item_id
            .ok_or_else(|| AppError::validation("target_item_id", "Target item is required"))?;
        validate_quantity(input.planned_qty).map_err(|m| AppError::validation("planned_qty", m))?;
        if !input.lines.is_empty() {
            validate_lines(&input.lines).map_err(|(index, message)| {
                AppError::validation(format!("lines[{}]", index), message)
            })?;
        }

        let item_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE id = $1)")
                .bind(target_item_id)
                .fetch_one(&self.db)
                .await?;
        if !item_exists {
            return Err(AppError::validation(
                "target_item_id",
                "Referenced item does not exist",
            ));
        }

        if let Some(machine_id) = input.machine_id {
            let machine_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM machines WHERE id = $1)")
                    .bind(machine_id)
                    .fetch_one(&self.db)
                    .await?;
            if !machine_exists {
                return Err(AppError::validation(
                    "machine_id",
                    "Referenced machine does not exist",
                ));
            }
        }

        let id = self
            .sequences
            .create_numbered(DocumentFamily::Production, |number| {
                let input = &input;
                async move {
                    let id = sqlx::query_scalar::<_, Uuid>(
                        r#"
                        INSERT INTO productions (
                            number, status, target_item_id, machine_id, planned_qty, lines,
                            start_date, notes, created_by
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                        RETURNING id
                        "#,
                    )
                    .bind(&number)
                    .bind(ProductionStatus::initial().as_str())
                    .bind(target_item_id)
                    .bind(input.machine_id)
                    .bind(input.planned_qty)
                    .bind(Json(&input.lines))
                    .bind(input.start_date)
                    .bind(&input.notes)
                    .bind(user_id)
                    .fetch_one(&self.db)
                    .await?;
                    tracing::info!(id = %id, number = %number, "production batch planned");
                    Ok(id)
                }
            })
            .await?;

        self.get(id).await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        update: &ProductionStatusUpdate,
    ) -> AppResult<DocumentDetail<Production>> {
        let to = parse_status::<ProductionStatus>(&update.status)?;
        if let Some(produced) = update.produced_qty {
            if produced < Decimal::ZERO {
                return Err(AppError::validation(
                    "produced_qty",
                    "Produced quantity cannot be negative",
                ));
            }
        }

        let mut tx = self.db.begin().await?;

        let (current, target_item_id, planned_qty, stored_produced) =
            sqlx::query_as::<_, (String, Uuid, Decimal, Option<Decimal>)>(
                r#"
                SELECT status, target_item_id, planned_qty, produced_qty
                FROM productions
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Production".to_string()))?;

        let mut status = parse_status::<ProductionStatus>(&current)?;
        let from = apply_transition(&mut status, to)?;

        let mut produced_qty = stored_produced;
        let mut warnings = Vec::new();
        if status == ProductionStatus::Completed {
            let produced = produced_quantity(planned_qty, update.produced_qty.or(stored_produced));
            if let Some(movement) = completion_movement(target_item_id, produced) {
                if let Err(warning) = self.ledger.adjust(&mut tx, &movement).await? {
                    warnings.push(warning);
                }
            }
            produced_qty = Some(produced);
        }

        sqlx::query(
            r#"
            UPDATE productions
            SET status = $2,
                produced_qty = $3,
                completed_at = CASE WHEN $2 = 'Completed' THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(produced_qty)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            id = %id,
            from = %from,
            to = %status,
            produced_qty = ?produced_qty,
            "production status changed"
        );

        Ok(self.get(id).await?.with_warnings(warnings))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM productions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Production".to_string()))?;

        ensure_deletable(parse_status::<ProductionStatus>(&current)?)?;

        sqlx::query("DELETE FROM productions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, "production batch deleted");
        Ok(())
    }
}
