//! Accounts and expenses
//!
//! Recording an expense draws its amount from an account; deleting it puts
//! the amount back. Both happen in the same transaction as the expense row.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::sequence::SequenceService;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{validate_amount, validate_quantity, DocumentFamily, PaginatedResponse, Pagination};

const SELECT_EXPENSE: &str = r#"
    SELECT e.id, e.number, e.account_id, a.name AS account_name, e.category, e.amount,
           e.expense_date, e.notes, e.created_by AS created_by_id, e.created_at
    FROM expenses e
    LEFT JOIN accounts a ON a.id = e.account_id
"#;

#[derive(Clone)]
pub struct FinanceService {
    db: PgPool,
    sequences: SequenceService,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub opening_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub number: String,
    pub account_id: Uuid,
    pub account_name: Option<String>,
    pub category: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseInput {
    pub account_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub amount: Decimal,
    pub expense_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseQuery {
    pub account_id: Option<Uuid>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// An expense together with the balance it left its account at
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseReceipt {
    #[serde(flatten)]
    pub expense: Expense,
    pub account_balance: Decimal,
}

impl FinanceService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            db,
        }
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT id, name, balance, created_at, updated_at FROM accounts ORDER BY name ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(accounts)
    }

    pub async fn get_account(&self, id: Uuid) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, name, balance, created_at, updated_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account".to_string()))
    }

    pub async fn create_account(&self, input: CreateAccountInput) -> AppResult<Account> {
        input
            .validate()
            .map_err(|e| AppError::validation("account", e.to_string()))?;
        validate_amount(input.opening_balance)
            .map_err(|m| AppError::validation("opening_balance", m))?;

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (name, balance)
            VALUES ($1, $2)
            RETURNING id, name, balance, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.opening_balance)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(account_id = %account.id, balance = %account.balance, "account opened");
        Ok(account)
    }

    // ========================================================================
    // Expenses
    // ========================================================================

    pub async fn list_expenses(&self, query: &ExpenseQuery) -> AppResult<PaginatedResponse<Expense>> {
        let page = Pagination::from_query(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM expenses e WHERE TRUE");
        push_expense_conditions(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_EXPENSE);
        select.push(" WHERE TRUE");
        push_expense_conditions(&mut select, query);
        select
            .push(" ORDER BY e.expense_date DESC, e.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let expenses = select.build_query_as::<Expense>().fetch_all(&self.db).await?;

        Ok(PaginatedResponse::new(expenses, &page, total.max(0) as u64))
    }

    pub async fn get_expense(&self, id: Uuid) -> AppResult<Expense> {
        sqlx::query_as::<_, Expense>(&format!("{} WHERE e.id = $1", SELECT_EXPENSE))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Expense".to_string()))
    }

    /// Record an expense and draw it from its account
    pub async fn create_expense(
        &self,
        input: CreateExpenseInput,
        user_id: Uuid,
    ) -> AppResult<ExpenseReceipt> {
        input
            .validate()
            .map_err(|e| AppError::validation("expense", e.to_string()))?;
        validate_quantity(input.amount)
            .map_err(|_| AppError::validation("amount", "Amount must be greater than zero"))?;

        let expense_date = input.expense_date.unwrap_or_else(|| Utc::now().date_naive());

        let (id, balance) = self
            .sequences
            .create_numbered(DocumentFamily::Expense, |number| {
                let input = &input;
                async move {
                    let mut tx = self.db.begin().await?;

                    let id = sqlx::query_scalar::<_, Uuid>(
                        r#"
                        INSERT INTO expenses (
                            number, account_id, category, amount, expense_date, notes, created_by
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        RETURNING id
                        "#,
                    )
                    .bind(&number)
                    .bind(input.account_id)
                    .bind(input.category.trim())
                    .bind(input.amount)
                    .bind(expense_date)
                    .bind(&input.notes)
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;

                    let balance = sqlx::query_scalar::<_, Decimal>(
                        r#"
                        UPDATE accounts
                        SET balance = balance - $2, updated_at = NOW()
                        WHERE id = $1
                        RETURNING balance
                        "#,
                    )
                    .bind(input.account_id)
                    .bind(input.amount)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| {
                        AppError::validation("account_id", "Referenced account does not exist")
                    })?;

                    tx.commit().await?;

                    tracing::info!(
                        expense_id = %id,
                        number = %number,
                        account_id = %input.account_id,
                        amount = %input.amount,
                        balance = %balance,
                        "expense recorded"
                    );
                    Ok((id, balance))
                }
            })
            .await?;

        Ok(ExpenseReceipt {
            expense: self.get_expense(id).await?,
            account_balance: balance,
        })
    }

    /// Delete an expense and give its amount back to the account
    pub async fn delete_expense(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let (account_id, amount) = sqlx::query_as::<_, (Uuid, Decimal)>(
            "DELETE FROM expenses WHERE id = $1 RETURNING account_id, amount",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Expense".to_string()))?;

        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING balance
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        match balance {
            Some(balance) => {
                tracing::info!(expense_id = %id, account_id = %account_id, balance = %balance, "expense deleted");
            }
            None => {
                tracing::warn!(expense_id = %id, account_id = %account_id, "expense deleted; account no longer exists");
            }
        }
        Ok(())
    }
}

fn push_expense_conditions(qb: &mut QueryBuilder<'_, Postgres>, query: &ExpenseQuery) {
    if let Some(account_id) = query.account_id {
        qb.push(" AND e.account_id = ").push_bind(account_id);
    }
    if let Some(category) = &query.category {
        qb.push(" AND e.category = ").push_bind(category.clone());
    }
    if let Some(from) = query.from {
        qb.push(" AND e.expense_date >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        qb.push(" AND e.expense_date <= ").push_bind(to);
    }
}
