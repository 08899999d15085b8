//! HTTP handlers for point-of-sale bills

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::bill::{Bill, BillService, CreateBillInput};
use crate::services::document::{DocumentDetail, DocumentFilter};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_bills(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<Bill>>> {
    current_user.0.require(Resource::Bill, Action::View)?;
    let service = BillService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<Bill>>> {
    current_user.0.require(Resource::Bill, Action::View)?;
    let service = BillService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

/// Ring up a sale; stock is decremented before the response is sent
pub async fn create_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBillInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<Bill>>)> {
    current_user.0.require(Resource::Bill, Action::Create)?;
    let service = BillService::new(state.db, &state.config);
    let bill = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}
