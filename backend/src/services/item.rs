//! Item master data and CSV bulk upload

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError, AppResult};
use shared::{
    validate_amount, validate_name, validate_sku, validate_tax_rate, PaginatedResponse, Pagination,
};

const SELECT_ITEM: &str = r#"
    SELECT id, name, sku, category, unit, stock, buy_price, sell_price, tax_rate,
           low_stock_threshold, created_at, updated_at
    FROM items
"#;

#[derive(Clone)]
pub struct ItemService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit: String,
    pub stock: Decimal,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub tax_rate: Decimal,
    pub low_stock_threshold: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemQuery {
    /// Matches name or SKU, case-insensitively
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Create body; also the shape of one bulk-upload CSV row
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemInput {
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub stock: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub low_stock_threshold: Option<Decimal>,
}

impl CreateItemInput {
    fn check(&self) -> AppResult<()> {
        validate_name(&self.name).map_err(|m| AppError::validation("name", m))?;
        validate_sku(&self.sku).map_err(|m| AppError::validation("sku", m))?;
        for (field, value) in [
            ("stock", self.stock),
            ("buy_price", self.buy_price),
            ("sell_price", self.sell_price),
            ("low_stock_threshold", self.low_stock_threshold),
        ] {
            if let Some(value) = value {
                validate_amount(value).map_err(|m| AppError::validation(field, m))?;
            }
        }
        if let Some(rate) = self.tax_rate {
            validate_tax_rate(rate).map_err(|m| AppError::validation("tax_rate", m))?;
        }
        Ok(())
    }
}

/// Partial update; an explicit `stock` overwrites the ledger figure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub stock: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub low_stock_threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 1-based line number in the uploaded file, header included
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkUploadReport {
    pub inserted: u32,
    pub updated: u32,
    pub failed: u32,
    pub errors: Vec<RowError>,
}

impl BulkUploadReport {
    fn fail(&mut self, row: usize, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }
}

/// Parse an item CSV (`name,sku,category,unit,stock,buy_price,sell_price,tax_rate,low_stock_threshold`).
///
/// Rows that fail to parse or validate are recorded in the report; the rest
/// are returned with their line numbers.
pub fn parse_item_csv(data: &[u8]) -> (Vec<(usize, CreateItemInput)>, BulkUploadReport) {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(data);

    let mut rows = Vec::new();
    let mut report = BulkUploadReport::default();

    for (index, record) in reader.deserialize::<CreateItemInput>().enumerate() {
        let row = index + 2;
        match record {
            Ok(input) => match input.check() {
                Ok(()) => rows.push((row, input)),
                Err(e) => report.fail(row, e.to_string()),
            },
            Err(e) => report.fail(row, e.to_string()),
        }
    }

    (rows, report)
}

impl ItemService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &ItemQuery) -> AppResult<PaginatedResponse<Item>> {
        let page = Pagination::from_query(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE TRUE");
        push_item_conditions(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_ITEM);
        select.push(" WHERE TRUE");
        push_item_conditions(&mut select, query);
        select
            .push(" ORDER BY name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Item>().fetch_all(&self.db).await?;

        Ok(PaginatedResponse::new(items, &page, total.max(0) as u64))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(&format!("{} WHERE id = $1", SELECT_ITEM))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))
    }

    pub async fn create(&self, input: CreateItemInput) -> AppResult<Item> {
        input.check()?;

        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (
                name, sku, category, unit, stock, buy_price, sell_price, tax_rate,
                low_stock_threshold
            )
            VALUES ($1, $2, $3, COALESCE($4, 'pcs'), COALESCE($5, 0), COALESCE($6, 0),
                    COALESCE($7, 0), COALESCE($8, 0), COALESCE($9, 0))
            RETURNING id, name, sku, category, unit, stock, buy_price, sell_price, tax_rate,
                      low_stock_threshold, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.sku)
        .bind(&input.category)
        .bind(&input.unit)
        .bind(input.stock)
        .bind(input.buy_price)
        .bind(input.sell_price)
        .bind(input.tax_rate)
        .bind(input.low_stock_threshold)
        .fetch_one(&self.db)
        .await
        .map_err(|e| duplicate_sku(e, &input.sku))?;

        tracing::info!(item_id = %item.id, sku = %item.sku, "item created");
        Ok(item)
    }

    pub async fn update(&self, id: Uuid, input: UpdateItemInput) -> AppResult<Item> {
        if let Some(name) = &input.name {
            validate_name(name).map_err(|m| AppError::validation("name", m))?;
        }
        if let Some(sku) = &input.sku {
            validate_sku(sku).map_err(|m| AppError::validation("sku", m))?;
        }
        for (field, value) in [
            ("stock", input.stock),
            ("buy_price", input.buy_price),
            ("sell_price", input.sell_price),
            ("low_stock_threshold", input.low_stock_threshold),
        ] {
            if let Some(value) = value {
                validate_amount(value).map_err(|m| AppError::validation(field, m))?;
            }
        }
        if let Some(rate) = input.tax_rate {
            validate_tax_rate(rate).map_err(|m| AppError::validation("tax_rate", m))?;
        }

        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET
                name = COALESCE($2, name),
                sku = COALESCE($3, sku),
                category = COALESCE($4, category),
                unit = COALESCE($5, unit),
                stock = COALESCE($6, stock),
                buy_price = COALESCE($7, buy_price),
                sell_price = COALESCE($8, sell_price),
                tax_rate = COALESCE($9, tax_rate),
                low_stock_threshold = COALESCE($10, low_stock_threshold),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, sku, category, unit, stock, buy_price, sell_price, tax_rate,
                      low_stock_threshold, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.sku)
        .bind(&input.category)
        .bind(&input.unit)
        .bind(input.stock)
        .bind(input.buy_price)
        .bind(input.sell_price)
        .bind(input.tax_rate)
        .bind(input.low_stock_threshold)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| duplicate_sku(e, input.sku.as_deref().unwrap_or_default()))?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        if input.stock.is_some() {
            tracing::info!(item_id = %id, stock = %item.stock, "item stock set by edit");
        }
        Ok(item)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item".to_string()));
        }

        tracing::info!(item_id = %id, "item deleted");
        Ok(())
    }

    /// Upsert every valid CSV row by SKU. Each row stands alone: one bad row
    /// does not stop the others.
    pub async fn bulk_upload(&self, data: &[u8]) -> AppResult<BulkUploadReport> {
        let (rows, mut report) = parse_item_csv(data);

        for (row, input) in rows {
            let inserted = sqlx::query_scalar::<_, bool>(
                r#"
                INSERT INTO items (
                    name, sku, category, unit, stock, buy_price, sell_price, tax_rate,
                    low_stock_threshold
                )
                VALUES ($1, $2, $3, COALESCE($4, 'pcs'), COALESCE($5, 0), COALESCE($6, 0),
                        COALESCE($7, 0), COALESCE($8, 0), COALESCE($9, 0))
                ON CONFLICT (sku) DO UPDATE SET
                    name = EXCLUDED.name,
                    category = COALESCE(EXCLUDED.category, items.category),
                    unit = COALESCE($4, items.unit),
                    stock = COALESCE($5, items.stock),
                    buy_price = COALESCE($6, items.buy_price),
                    sell_price = COALESCE($7, items.sell_price),
                    tax_rate = COALESCE($8, items.tax_rate),
                    low_stock_threshold = COALESCE($9, items.low_stock_threshold),
                    updated_at = NOW()
                RETURNING (xmax = 0)
                "#,
            )
            .bind(input.name.trim())
            .bind(&input.sku)
            .bind(&input.category)
            .bind(&input.unit)
            .bind(input.stock)
            .bind(input.buy_price)
            .bind(input.sell_price)
            .bind(input.tax_rate)
            .bind(input.low_stock_threshold)
            .fetch_one(&self.db)
            .await;

            match inserted {
                Ok(true) => report.inserted += 1,
                Ok(false) => report.updated += 1,
                Err(e) => {
                    tracing::warn!(row, sku = %input.sku, error = %e, "bulk upload row failed");
                    report.fail(row, "Could not save row");
                }
            }
        }

        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed,
            "item bulk upload finished"
        );
        Ok(report)
    }
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards in the term
/// taken literally. Pair with `ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_item_conditions(qb: &mut QueryBuilder<'_, Postgres>, query: &ItemQuery) {
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_pattern(search.trim());
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR sku ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if query.low_stock {
        qb.push(" AND stock <= low_stock_threshold");
    }
}

fn duplicate_sku(e: sqlx::Error, sku: &str) -> AppError {
    if is_unique_violation(&e) {
        AppError::DuplicateEntry(format!("sku {}", sku))
    } else {
        AppError::DatabaseError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str =
        "name,sku,category,unit,stock,buy_price,sell_price,tax_rate,low_stock_threshold\n";

    #[test]
    fn test_parse_valid_rows() {
        let csv = format!(
            "{}Basmati Rice 5kg,RICE-5,Grocery,bag,40,310.50,375,5,10\nSalt,SALT-1,,,,,,,\n",
            HEADER
        );
        let (rows, report) = parse_item_csv(csv.as_bytes());

        assert_eq!(report.failed, 0);
        assert_eq!(rows.len(), 2);
        let (row, rice) = &rows[0];
        assert_eq!(*row, 2);
        assert_eq!(rice.sku, "RICE-5");
        assert_eq!(rice.buy_price, Some(dec!(310.50)));
        assert_eq!(rows[1].1.stock, None);
        assert_eq!(rows[1].1.category, None);
    }

    #[test]
    fn test_bad_rows_are_reported_with_line_numbers() {
        let csv = format!(
            "{}Milk,MILK-1,Dairy,l,5,20,25,0,2\nBroken,BAD SKU,,,,,,,\nOil,OIL-1,,,abc,,,,\nTea,TEA-1,,,,,,150,\n",
            HEADER
        );
        let (rows, report) = parse_item_csv(csv.as_bytes());

        assert_eq!(rows.len(), 1);
        assert_eq!(report.failed, 3);
        let failed_rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(failed_rows, vec![3, 4, 5]);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        assert_eq!(contains_pattern("50%"), r"%50\%%");
        assert_eq!(contains_pattern("a_b"), r"%a\_b%");
        assert_eq!(contains_pattern(r"C:\tmp"), r"%C:\\tmp%");
        assert_eq!(contains_pattern("rice"), "%rice%");
    }

    #[test]
    fn test_search_condition_declares_escape() {
        let query = ItemQuery {
            search: Some(" 50% ".to_string()),
            category: None,
            low_stock: false,
            page: None,
            per_page: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM items WHERE TRUE");
        push_item_conditions(&mut qb, &query);

        assert_eq!(
            qb.sql(),
            r"SELECT id FROM items WHERE TRUE AND (name ILIKE $1 ESCAPE '\' OR sku ILIKE $2 ESCAPE '\')"
        );
    }
}
