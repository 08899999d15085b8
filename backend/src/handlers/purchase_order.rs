//! HTTP handlers for purchase orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::document::{DocumentDetail, DocumentFilter, StatusUpdate};
use crate::services::purchase_order::{
    CreatePurchaseOrderInput, PendingPurchaseOrder, PurchaseOrder, PurchaseOrderService,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<PurchaseOrder>>> {
    current_user.0.require(Resource::PurchaseOrder, Action::View)?;
    let service = PurchaseOrderService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<PurchaseOrder>>> {
    current_user.0.require(Resource::PurchaseOrder, Action::View)?;
    let service = PurchaseOrderService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<PurchaseOrder>>)> {
    current_user.0.require(Resource::PurchaseOrder, Action::Create)?;
    let service = PurchaseOrderService::new(state.db, &state.config);
    let document = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<DocumentDetail<PurchaseOrder>>> {
    current_user.0.require(Resource::PurchaseOrder, Action::ChangeStatus)?;
    let service = PurchaseOrderService::new(state.db, &state.config);
    Ok(Json(service.update_status(id, &update).await?))
}

/// Only documents still in their initial state can be deleted
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::PurchaseOrder, Action::Delete)?;
    let service = PurchaseOrderService::new(state.db, &state.config);
    service.delete(id).await?;
    Ok(Json(()))
}

/// Orders a GRN can still be raised against, with what remains to receive
pub async fn list_pending_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<PendingPurchaseOrder>>> {
    current_user.0.require(Resource::Grn, Action::View)?;
    let service = PurchaseOrderService::new(state.db, &state.config);
    Ok(Json(service.pending().await?))
}
