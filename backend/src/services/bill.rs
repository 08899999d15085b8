//! Point-of-sale billing
//!
//! A bill takes its lines out of stock when it is created. Bills have no
//! status and cannot be deleted once stock has moved.

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
use super::stock::{StockLedger, Warning};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{
    sale_movements, validate_amount, DocumentFamily, DocumentTotals, LineItem, PaginatedResponse,
    PaymentMode,
};

const SELECT_BILL: &str = r#"
    SELECT d.id, d.number, d.customer_id, c.name AS customer_name, d.lines, d.total_amount,
           d.discount, d.tax_amount, d.final_amount, d.payment_mode, d.notes,
           d.created_by AS created_by_id, d.created_at, d.updated_at
    FROM bills d
    LEFT JOIN contacts c ON c.id = d.customer_id
"#;

#[derive(Clone)]
pub struct BillService {
    db: PgPool,
    sequences: SequenceService,
    ledger: StockLedger,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Bill {
    pub id: Uuid,
    pub number: String,
    /// `None` for walk-in customers
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub lines: Json<Vec<LineItem>>,
    pub total_amount: Decimal,
    pub discount: Decimal,
    pub tax_amount: Decimal,
    pub final_amount: Decimal,
    pub payment_mode: String,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillInput {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    /// Stored as supplied; derived from the other amounts when omitted
    pub final_amount: Option<Decimal>,
    pub payment_mode: Option<PaymentMode>,
    pub notes: Option<String>,
}

impl CreateBillInput {
    fn final_amount(&self, total_amount: Decimal) -> Decimal {
        self.final_amount
            .unwrap_or(total_amount - self.discount + self.tax_amount)
    }
}

impl BillService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            ledger: StockLedger::new(config.inventory.negative_stock),
            db,
        }
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<PaginatedResponse<Bill>> {
        if filter.status.is_some() {
            return Err(AppError::validation("status", "Bills do not have a status"));
        }
        list_documents(&self.db, SELECT_BILL, "bills", Some("customer_id"), filter).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DocumentDetail<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!("{} WHERE d.id = $1", SELECT_BILL))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Bill".to_string()))?;

        let lines = bill.lines.0.clone();
        let created_by = bill.created_by_id;
        expand(&self.db, bill, &lines, created_by).await
    }

    /// Record a sale and take its lines out of stock in one transaction
    pub async fn create(
        &self,
        input: CreateBillInput,
        user_id: Uuid,
    ) -> AppResult<DocumentDetail<Bill>> {
        input
            .validate()
            .map_err(|e| AppError::validation("lines", e.to_string()))?;
        check_lines(DocumentFamily::Bill, &input.lines)?;
        validate_amount(input.discount).map_err(|m| AppError::validation("discount", m))?;
        validate_amount(input.tax_amount).map_err(|m| AppError::validation("tax_amount", m))?;

        let totals = DocumentTotals::compute(&input.lines, None);
        let final_amount = input.final_amount(totals.total_amount);
        let payment_mode = input.payment_mode.unwrap_or(PaymentMode::Cash);
        let movements = sale_movements(&input.lines);

        let (id, warnings) = self
            .sequences
            .create_numbered(DocumentFamily::Bill, |number| {
                let input = &input;
                let movements = &movements;
                async move {
                    let mut tx = self.db.begin().await?;

                    if let Some(customer_id) = input.customer_id {
                        ensure_contact(&mut *tx, "customer_id", customer_id).await?;
                    }

                    let id = sqlx::query_scalar::<_, Uuid>(
                        r#"
                        INSERT INTO bills (
                            number, customer_id, lines, total_amount, discount, tax_amount,
                            final_amount, payment_mode, notes, created_by
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        RETURNING id
                        "#,
                    )
                    .bind(&number)
                    .bind(input.customer_id)
                    .bind(Json(&input.lines))
                    .bind(totals.total_amount)
                    .bind(input.discount)
                    .bind(input.tax_amount)
                    .bind(final_amount)
                    .bind(payment_mode.as_str())
                    .bind(&input.notes)
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;

                    let warnings: Vec<Warning> = self.ledger.apply_all(&mut tx, movements).await?;

                    tx.commit().await?;

                    tracing::info!(
                        id = %id,
                        number = %number,
                        final_amount = %final_amount,
                        payment_mode = %payment_mode.as_str(),
                        "bill created"
                    );
                    Ok((id, warnings))
                }
            })
            .await?;

        Ok(self.get(id).await?.with_warnings(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(final_amount: Option<Decimal>) -> CreateBillInput {
        CreateBillInput {
            customer_id: None,
            lines: vec![LineItem::new(Uuid::new_v4(), dec!(2), dec!(10))],
            discount: dec!(3),
            tax_amount: dec!(1.5),
            final_amount,
            payment_mode: None,
            notes: None,
        }
    }

    #[test]
    fn test_final_amount_kept_as_supplied() {
        assert_eq!(input(Some(dec!(99))).final_amount(dec!(20)), dec!(99));
    }

    #[test]
    fn test_final_amount_derived_when_missing() {
        assert_eq!(input(None).final_amount(dec!(20)), dec!(18.5));
    }
}
