//! Sales and stock reporting
//! Read-only aggregates over bills and items, with CSV export

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{DateRange, PurchaseOrderStatus, StatusMachine};

const DEFAULT_TOP_ITEMS: i64 = 10;
const MAX_TOP_ITEMS: i64 = 100;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Totals over all bills in a period
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SalesSummary {
    pub bill_count: i64,
    pub revenue: Decimal,
    pub tax_collected: Decimal,
    pub discount_given: Decimal,
    pub average_bill_value: Decimal,
}

/// One day of sales
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub day: NaiveDate,
    pub bill_count: i64,
    pub revenue: Decimal,
}

/// An item ranked by quantity sold
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopItem {
    pub item_id: Uuid,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub quantity_sold: Decimal,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LowStockItem {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub stock: Decimal,
    pub low_stock_threshold: Decimal,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub open_purchase_orders: i64,
    pub pending_grns: i64,
    pub low_stock_items: i64,
    pub today_bill_count: i64,
    pub today_revenue: Decimal,
}

/// Report filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl ReportFilter {
    fn range(&self) -> AppResult<DateRange> {
        let range = DateRange {
            from: self.from,
            to: self.to,
        };
        if !range.is_valid() {
            return Err(AppError::validation("from", "Start date must not be after end date"));
        }
        Ok(range)
    }

    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_TOP_ITEMS).clamp(1, MAX_TOP_ITEMS)
    }
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Bill count, revenue and tax over a period
    pub async fn sales_summary(&self, filter: &ReportFilter) -> AppResult<SalesSummary> {
        let range = filter.range()?;

        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT
                COUNT(*) AS bill_count,
                COALESCE(SUM(final_amount), 0) AS revenue,
                COALESCE(SUM(tax_amount), 0) AS tax_collected,
                COALESCE(SUM(discount), 0) AS discount_given,
                COALESCE(AVG(final_amount), 0) AS average_bill_value
            FROM bills
            WHERE ($1::date IS NULL OR created_at::date >= $1)
              AND ($2::date IS NULL OR created_at::date <= $2)
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.db)
        .await?;

        Ok(summary)
    }

    pub async fn daily_sales(&self, filter: &ReportFilter) -> AppResult<Vec<DailySales>> {
        let range = filter.range()?;

        let days = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT
                created_at::date AS day,
                COUNT(*) AS bill_count,
                COALESCE(SUM(final_amount), 0) AS revenue
            FROM bills
            WHERE ($1::date IS NULL OR created_at::date >= $1)
              AND ($2::date IS NULL OR created_at::date <= $2)
            GROUP BY created_at::date
            ORDER BY day ASC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.db)
        .await?;

        Ok(days)
    }

    /// Items ranked by quantity sold, read from the bill lines
    pub async fn top_items(&self, filter: &ReportFilter) -> AppResult<Vec<TopItem>> {
        let range = filter.range()?;

        let items = sqlx::query_as::<_, TopItem>(
            r#"
            SELECT
                (line->>'item_id')::uuid AS item_id,
                i.name,
                i.sku,
                SUM((line->>'quantity')::numeric) AS quantity_sold,
                SUM((line->>'subtotal')::numeric) AS revenue
            FROM bills b
            CROSS JOIN LATERAL jsonb_array_elements(b.lines) AS line
            LEFT JOIN items i ON i.id = (line->>'item_id')::uuid
            WHERE ($1::date IS NULL OR b.created_at::date >= $1)
              AND ($2::date IS NULL OR b.created_at::date <= $2)
            GROUP BY (line->>'item_id')::uuid, i.name, i.sku
            ORDER BY quantity_sold DESC
            LIMIT $3
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(filter.limit())
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn low_stock(&self) -> AppResult<Vec<LowStockItem>> {
        let items = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT id, name, sku, stock, low_stock_threshold
            FROM items
            WHERE stock <= low_stock_threshold
            ORDER BY stock - low_stock_threshold ASC, name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Get dashboard metrics
    pub async fn dashboard(&self) -> AppResult<DashboardMetrics> {
        let open_statuses: Vec<&str> = PurchaseOrderStatus::ALL
            .iter()
            .filter(|s| !s.is_terminal())
            .map(|s| s.as_str())
            .collect();

        let open_purchase_orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM purchase_orders WHERE status = ANY($1)")
                .bind(&open_statuses)
                .fetch_one(&self.db)
                .await?;

        let pending_grns: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM grns WHERE status <> 'Completed'")
                .fetch_one(&self.db)
                .await?;

        let low_stock_items: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE stock <= low_stock_threshold")
                .fetch_one(&self.db)
                .await?;

        let today = Utc::now().date_naive();
        let (today_bill_count, today_revenue): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(final_amount), 0)
            FROM bills
            WHERE created_at::date = $1
            "#,
        )
        .bind(today)
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardMetrics {
            open_purchase_orders,
            pending_grns,
            low_stock_items,
            today_bill_count,
            today_revenue,
        })
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
