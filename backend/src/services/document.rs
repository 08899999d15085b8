//! Plumbing shared by the document services: list filters, reference checks
//! and display expansion

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::stock::Warning;
use crate::error::{AppError, AppResult};
use shared::{
    mismatched_subtotals, validate_lines, DocumentFamily, PaginatedResponse, Pagination, Priced,
    StatusMachine,
};

/// Query parameters accepted by every document list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentFilter {
    pub status: Option<String>,
    pub counterparty: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl DocumentFilter {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.per_page)
    }

    /// Append `AND ...` clauses for this filter. Document columns are
    /// expected under the alias `d`.
    pub fn push_conditions(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        counterparty_column: Option<&str>,
    ) {
        if let Some(status) = &self.status {
            qb.push(" AND d.status = ").push_bind(status.clone());
        }
        if let (Some(counterparty), Some(column)) = (self.counterparty, counterparty_column) {
            qb.push(format!(" AND d.{} = ", column)).push_bind(counterparty);
        }
        if let Some(from) = self.from {
            qb.push(" AND d.created_at::date >= ").push_bind(from);
        }
        if let Some(to) = self.to {
            qb.push(" AND d.created_at::date <= ").push_bind(to);
        }
    }
}

/// Run a filtered, paginated list query.
///
/// `select` must read from `table` aliased as `d` and may join other tables;
/// it must not contain a `WHERE` clause.
pub async fn list_documents<T>(
    db: &PgPool,
    select: &str,
    table: &str,
    counterparty_column: Option<&str>,
    filter: &DocumentFilter,
) -> AppResult<PaginatedResponse<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let page = filter.pagination();

    let mut count =
        QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} d WHERE TRUE", table));
    filter.push_conditions(&mut count, counterparty_column);
    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut query = QueryBuilder::<Postgres>::new(select);
    query.push(" WHERE TRUE");
    filter.push_conditions(&mut query, counterparty_column);
    query
        .push(" ORDER BY d.created_at DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = query.build_query_as::<T>().fetch_all(db).await?;

    Ok(PaginatedResponse::new(rows, &page, total.max(0) as u64))
}

/// Body of every `PATCH /:id/status` request
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Counterparty or user reference expanded for display
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PartySummary {
    pub id: Uuid,
    pub name: String,
}

/// Item reference expanded for display
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ItemSummary {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
}

/// A document with its references expanded
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail<D: Serialize> {
    #[serde(flatten)]
    pub document: D,
    pub created_by: Option<PartySummary>,
    pub items: HashMap<Uuid, ItemSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl<D: Serialize> DocumentDetail<D> {
    pub fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Look up display data for every item referenced by `lines`
pub async fn item_summaries<L: Priced>(
    db: &PgPool,
    lines: &[L],
) -> AppResult<HashMap<Uuid, ItemSummary>> {
    let ids: Vec<Uuid> = lines.iter().map(Priced::item_id).collect();
    item_summaries_by_id(db, &ids).await
}

pub async fn item_summaries_by_id(
    db: &PgPool,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, ItemSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let items = sqlx::query_as::<_, ItemSummary>(
        "SELECT id, name, sku, unit FROM items WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(db)
    .await?;

    Ok(items.into_iter().map(|i| (i.id, i)).collect())
}

pub async fn user_summary(db: &PgPool, user_id: Uuid) -> AppResult<Option<PartySummary>> {
    let user = sqlx::query_as::<_, PartySummary>("SELECT id, name FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// Build the detail view of a document whose lines reference items
pub async fn expand<D: Serialize, L: Priced>(
    db: &PgPool,
    document: D,
    lines: &[L],
    created_by: Uuid,
) -> AppResult<DocumentDetail<D>> {
    Ok(DocumentDetail {
        items: item_summaries(db, lines).await?,
        created_by: user_summary(db, created_by).await?,
        document,
        warnings: Vec::new(),
    })
}

/// Check lines and log any subtotal that disagrees with `quantity × unit_price`
pub fn check_lines<L: Priced>(family: DocumentFamily, lines: &[L]) -> AppResult<()> {
    validate_lines(lines)
        .map_err(|(index, message)| AppError::validation(format!("lines[{}]", index), message))?;

    for index in mismatched_subtotals(lines) {
        let line = &lines[index];
        tracing::warn!(
            family = %family,
            line = index,
            quantity = %line.quantity(),
            unit_price = %line.unit_price(),
            subtotal = %line.subtotal(),
            "line subtotal does not match quantity x unit price; storing as given"
        );
    }
    Ok(())
}

/// A required contact reference must point at an existing contact
pub async fn ensure_contact(
    executor: impl PgExecutor<'_>,
    field: &str,
    contact_id: Uuid,
) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM contacts WHERE id = $1)")
        .bind(contact_id)
        .fetch_one(executor)
        .await?;

    if !exists {
        return Err(AppError::validation(field, "Referenced contact does not exist"));
    }
    Ok(())
}

/// Documents may only be deleted while in their family's initial state
pub fn ensure_deletable<S: StatusMachine>(status: S) -> AppResult<()> {
    if status.is_initial() {
        Ok(())
    } else {
        Err(AppError::IllegalDeleteState {
            document: S::FAMILY.label().to_string(),
            initial: S::initial().as_str().to_string(),
        })
    }
}

/// Parse a stored or requested status for a family
pub fn parse_status<S: StatusMachine>(value: &str) -> AppResult<S> {
    Ok(shared::parse_status::<S>(value)?)
}

/// Parse an optional status filter up front so bad values fail with `400`
pub fn check_status_filter<S: StatusMachine>(filter: &DocumentFilter) -> AppResult<()> {
    if let Some(status) = &filter.status {
        parse_status::<S>(status)?;
    }
    Ok(())
}
