//! Reporting handlers for analytics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::services::reporting::{DashboardMetrics, ReportFilter, ReportingService};
use crate::AppState;
use shared::{Action, Resource};

#[derive(Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub format: Option<String>, // "json" or "csv"
}

impl ReportQuery {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            from: self.from,
            to: self.to,
            limit: self.limit,
        }
    }

    fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

/// JSON by default, a CSV attachment when `format=csv`
fn respond<T: Serialize>(data: Vec<T>, csv: bool, filename: &str) -> AppResult<Response> {
    if csv {
        let body = ReportingService::export_to_csv(&data)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            body,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DashboardMetrics>> {
    user.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    Ok(Json(service.dashboard().await?))
}

pub async fn get_sales_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let summary = service.sales_summary(&query.filter()).await?;
    if query.wants_csv() {
        respond(vec![summary], true, "sales_summary.csv")
    } else {
        Ok(Json(summary).into_response())
    }
}

pub async fn get_daily_sales(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let days = service.daily_sales(&query.filter()).await?;
    respond(days, query.wants_csv(), "daily_sales.csv")
}

pub async fn get_top_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let items = service.top_items(&query.filter()).await?;
    respond(items, query.wants_csv(), "top_items.csv")
}

pub async fn get_low_stock_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let items = service.low_stock().await?;
    respond(items, query.wants_csv(), "low_stock.csv")
}
