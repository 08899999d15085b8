//! Document number allocation
//!
//! Each `(prefix, scope)` bucket owns a counter row in `document_sequences`.
//! The counter is advanced with a single atomic statement, so two requests
//! can never be handed the same number. A missing counter row is seeded from
//! the greatest number already stored in the family's table.

use std::future::Future;

use chrono::{Datelike, Utc};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{bucket_prefix, next_number, DocumentFamily, DocumentNumber, NumberScope};

/// Table holding the numbered documents of a family
pub fn table_for(family: DocumentFamily) -> &'static str {
    match family {
        DocumentFamily::PurchaseOrder => "purchase_orders",
        DocumentFamily::Grn => "grns",
        DocumentFamily::StockTransfer => "stock_transfers",
        DocumentFamily::Production => "productions",
        DocumentFamily::ProformaInvoice => "proforma_invoices",
        DocumentFamily::DeliveryChallan => "delivery_challans",
        DocumentFamily::Bill => "bills",
        DocumentFamily::Purchase => "purchases",
        DocumentFamily::Expense => "expenses",
        DocumentFamily::Machine => "machines",
    }
}

#[derive(Clone)]
pub struct SequenceService {
    db: PgPool,
    max_attempts: u32,
}

impl SequenceService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            max_attempts: config.numbering.max_attempts.max(1),
        }
    }

    /// Mint the next number for a family in the current year
    pub async fn next(&self, family: DocumentFamily) -> AppResult<String> {
        let scope = family.scope_for_year(Utc::now().year());
        Ok(self.next_in(family, scope).await?.to_string())
    }

    /// Mint the next number of a specific bucket.
    ///
    /// Runs on the pool rather than inside the caller's transaction, so a
    /// rolled-back document burns its number instead of reusing it.
    pub async fn next_in(
        &self,
        family: DocumentFamily,
        scope: NumberScope,
    ) -> AppResult<DocumentNumber> {
        let prefix = family.prefix();
        let key = scope.key();

        let advanced = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE document_sequences
            SET last_value = last_value + 1
            WHERE prefix = $1 AND scope = $2
            RETURNING last_value
            "#,
        )
        .bind(prefix)
        .bind(&key)
        .fetch_optional(&self.db)
        .await?;

        let value = match advanced {
            Some(value) => value,
            None => self.seed(family, scope).await?,
        };

        let sequence = u32::try_from(value)
            .map_err(|_| AppError::DuplicateDocumentNumber(bucket_prefix(family, scope)))?;

        Ok(DocumentNumber::new(family, scope, sequence)?)
    }

    /// Create the counter row, starting after the greatest stored number
    async fn seed(&self, family: DocumentFamily, scope: NumberScope) -> AppResult<i64> {
        let bucket = bucket_prefix(family, scope);

        let latest = sqlx::query_scalar::<_, String>(&format!(
            "SELECT number FROM {} WHERE number LIKE $1 ORDER BY number DESC LIMIT 1",
            table_for(family)
        ))
        .bind(format!("{}%", bucket))
        .fetch_optional(&self.db)
        .await?;

        let first = next_number(family, scope, latest.as_deref())?;

        tracing::debug!(bucket = %bucket, first = %first, "seeding document sequence");

        // A concurrent seeder may win the insert; then we simply take the next value
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO document_sequences (prefix, scope, last_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (prefix, scope)
            DO UPDATE SET last_value = document_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(family.prefix())
        .bind(scope.key())
        .bind(i64::from(first.sequence))
        .fetch_one(&self.db)
        .await?;

        Ok(value)
    }

    /// Run `insert` with freshly minted numbers until it stops hitting the
    /// unique constraint on `number`, up to the configured attempt count.
    pub async fn create_numbered<T, F, Fut>(&self, family: DocumentFamily, mut insert: F) -> AppResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        for attempt in 1..=self.max_attempts {
            let number = self.next(family).await?;

            match insert(number.clone()).await {
                Err(AppError::DatabaseError(e)) if is_duplicate_number(&e) => {
                    tracing::warn!(
                        family = %family,
                        number = %number,
                        attempt,
                        "document number already taken, retrying"
                    );
                }
                other => return other,
            }
        }

        Err(AppError::DuplicateDocumentNumber(family.label().to_string()))
    }
}

/// Unique violation on a `<table>_number_key` constraint
fn is_duplicate_number(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation()
                && db
                    .constraint()
                    .map(|c| c.ends_with("_number_key"))
                    .unwrap_or(false)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::setup;
    use uuid::Uuid;

    #[test]
    fn test_every_family_has_a_table() {
        let mut tables: Vec<_> = DocumentFamily::ALL.iter().map(|f| table_for(*f)).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), DocumentFamily::ALL.len());
    }

    #[test]
    #[ignore] // Requires database connection
    fn test_counter_seeds_from_stored_numbers() {
        tokio_test::block_on(async {
            let (pool, config) = setup().await;
            let sequences = SequenceService::new(pool.clone(), &config);
            let scope = NumberScope::Year(1999);

            sqlx::query("DELETE FROM document_sequences WHERE prefix = 'EXP' AND scope = '1999'")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("DELETE FROM expenses WHERE number LIKE 'EXP-1999-%'")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query(
                r#"
                INSERT INTO expenses (number, account_id, category, amount, created_by)
                VALUES ('EXP-1999-00041', $1, 'Rent', 10, $2)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(Uuid::new_v4())
            .execute(&pool)
            .await
            .unwrap();

            let first = sequences.next_in(DocumentFamily::Expense, scope).await.unwrap();
            let second = sequences.next_in(DocumentFamily::Expense, scope).await.unwrap();
            assert_eq!(first.to_string(), "EXP-1999-00042");
            assert_eq!(second.to_string(), "EXP-1999-00043");

            sqlx::query("DELETE FROM expenses WHERE number LIKE 'EXP-1999-%'")
                .execute(&pool)
                .await
                .unwrap();
        });
    }

    #[test]
    #[ignore] // Requires database connection
    fn test_taken_number_is_retried() {
        tokio_test::block_on(async {
            let (pool, config) = setup().await;
            let sequences = SequenceService::new(pool.clone(), &config);
            let family = DocumentFamily::Machine;

            // Occupy the number the counter will hand out next
            let current = sequences.next_in(family, NumberScope::Unscoped).await.unwrap();
            let taken = DocumentNumber::new(family, NumberScope::Unscoped, current.sequence + 1)
                .unwrap()
                .to_string();
            sqlx::query("INSERT INTO machines (number, name) VALUES ($1, 'Label printer')")
                .bind(&taken)
                .execute(&pool)
                .await
                .unwrap();

            let mut attempts = 0;
            let (_, number) = sequences
                .create_numbered(family, |number| {
                    attempts += 1;
                    let pool = pool.clone();
                    async move {
                        let id = sqlx::query_scalar::<_, Uuid>(
                            "INSERT INTO machines (number, name) VALUES ($1, 'Scale') RETURNING id",
                        )
                        .bind(&number)
                        .fetch_one(&pool)
                        .await?;
                        Ok::<_, AppError>((id, number))
                    }
                })
                .await
                .unwrap();

            assert_eq!(attempts, 2);
            assert_ne!(number, taken);
            assert_eq!(
                number,
                DocumentNumber::new(family, NumberScope::Unscoped, current.sequence + 2)
                    .unwrap()
                    .to_string()
            );
        });
    }
}
