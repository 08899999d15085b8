//! HTTP handlers for stock transfers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::document::{DocumentDetail, DocumentFilter, StatusUpdate};
use crate::services::stock_transfer::{
    CreateStockTransferInput, StockTransfer, StockTransferService,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_stock_transfers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<StockTransfer>>> {
    current_user.0.require(Resource::StockTransfer, Action::View)?;
    let service = StockTransferService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<StockTransfer>>> {
    current_user.0.require(Resource::StockTransfer, Action::View)?;
    let service = StockTransferService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

pub async fn create_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockTransferInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<StockTransfer>>)> {
    current_user.0.require(Resource::StockTransfer, Action::Create)?;
    let service = StockTransferService::new(state.db, &state.config);
    let document = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_stock_transfer_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<DocumentDetail<StockTransfer>>> {
    current_user.0.require(Resource::StockTransfer, Action::ChangeStatus)?;
    let service = StockTransferService::new(state.db, &state.config);
    Ok(Json(service.update_status(id, &update).await?))
}

/// Only documents still in their initial state can be deleted
pub async fn delete_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::StockTransfer, Action::Delete)?;
    let service = StockTransferService::new(state.db, &state.config);
    service.delete(id).await?;
    Ok(Json(()))
}
