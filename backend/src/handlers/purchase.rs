//! HTTP handlers for direct purchases

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::document::{DocumentDetail, DocumentFilter};
use crate::services::purchase::{CreatePurchaseInput, Purchase, PurchaseService};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_purchases(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<Purchase>>> {
    current_user.0.require(Resource::Purchase, Action::View)?;
    let service = PurchaseService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<Purchase>>> {
    current_user.0.require(Resource::Purchase, Action::View)?;
    let service = PurchaseService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

pub async fn create_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<Purchase>>)> {
    current_user.0.require(Resource::Purchase, Action::Create)?;
    let service = PurchaseService::new(state.db, &state.config);
    let purchase = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}
