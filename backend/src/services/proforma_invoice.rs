//! Proforma invoice service

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
    PaginatedResponse, ProformaStatus, StatusMachine,
};

const SELECT_PROFORMA: &str = r#"
    SELECT d.id, d.number, d.status, d.customer_id, c.name AS customer_name, d.lines,
           d.total_amount, d.tax_rate, d.tax_amount, d.grand_total, d.valid_until, d.notes,
           d.created_by AS created_by_id, d.created_at, d.updated_at
    FROM proforma_invoices d
    LEFT JOIN contacts c ON c.id = d.customer_id
"#;

#[derive(Clone)]
pub struct ProformaInvoiceService {
    db: PgPool,
    sequences: SequenceService,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProformaInvoice {
    pub id: Uuid,
    pub number: String,
    pub status: String,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub lines: Json<Vec<LineItem>>,
    pub total_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProformaInput {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub lines: Vec<LineItem>,
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ProformaInvoiceService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            db,
        }
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<PaginatedResponse<ProformaInvoice>> {
        check_status_filter::<ProformaStatus>(filter)?;
        list_documents(
            &self.db,
            SELECT_PROFORMA,
            "proforma_invoices",
            Some("customer_id"),
            filter,
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DocumentDetail<ProformaInvoice>> {
        let invoice =
            sqlx::query_as::<_, ProformaInvoice>(&format!("{} WHERE d.id = $1", SELECT_PROFORMA))
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Proforma invoice".to_string()))?;

        let lines = invoice.lines.0.clone();
        let created_by = invoice.created_by_id;
        expand(&self.db, invoice, &lines, created_by).await
    }

    pub async fn create(
        &self,
        input: CreateProformaInput,
        user_id: Uuid,
    ) -> AppResult<DocumentDetail<ProformaInvoice>> {
        input
            .validate()
            .map_err(|e| AppError::validation("lines", e.to_string()))?;
        let customer_id = input
            .customer_id
            .ok_or_else(|| AppError::validation("customer_id", "Customer is required"))?;
        check_lines(DocumentFamily::ProformaInvoice, &input.lines)?;
        if let Some(rate) = input.tax_rate {
            validate_tax_rate(rate).map_err(|m| AppError::validation("tax_rate", m))?;
        }
        if let Some(valid_until) = input.valid_until {
            if valid_until < Utc::now().date_naive() {
                return Err(AppError::validation(
                    "valid_until",
                    "Validity date cannot be in the past",
                ));
            }
        }
        ensure_contact(&self.db, "customer_id", customer_id).await?;

        let totals = DocumentTotals::compute(&input.lines, input.tax_rate);

        let id = self
            .sequences
            .create_numbered(DocumentFamily::ProformaInvoice, |number| {
                let input = &input;
                async move {
                    let id = sqlx::query_scalar::<_, Uuid>(
                        r#"
                        INSERT INTO proforma_invoices (
                            number, status, customer_id, lines, total_amount, tax_rate,
                            tax_amount, grand_total, valid_until, notes, created_by
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                        RETURNING id
                        "#,
                    )
                    .bind(&number)
                    .bind(ProformaStatus::initial().as_str())
                    .bind(customer_id)
                    .bind(Json(&input.lines))
                    .bind(totals.total_amount)
                    .bind(totals.tax_rate)
                    .bind(totals.tax_amount)
                    .bind(totals.grand_total)
                    .bind(input.valid_until)
                    .bind(&input.notes)
                    .bind(user_id)
                    .fetch_one(&self.db)
                    .await?;
                    tracing::info!(id = %id, number = %number, "proforma invoice created");
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
    ) -> AppResult<DocumentDetail<ProformaInvoice>> {
        let to = parse_status::<ProformaStatus>(&update.status)?;

        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM proforma_invoices WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Proforma invoice".to_string()))?;

        let mut status = parse_status::<ProformaStatus>(&current)?;
        let from = apply_transition(&mut status, to)?;

        sqlx::query("UPDATE proforma_invoices SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, from = %from, to = %status, "proforma invoice status changed");

        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM proforma_invoices WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Proforma invoice".to_string()))?;

        ensure_deletable(parse_status::<ProformaStatus>(&current)?)?;

        sqlx::query("DELETE FROM proforma_invoices WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, "proforma invoice deleted");
        Ok(())
    }
}
