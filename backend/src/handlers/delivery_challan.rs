//! HTTP handlers for delivery challans

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::document::{DocumentDetail, DocumentFilter, StatusUpdate};
use crate::services::delivery_challan::{
    CreateChallanInput, DeliveryChallan, DeliveryChallanService,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_delivery_challans(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<DeliveryChallan>>> {
    current_user.0.require(Resource::DeliveryChallan, Action::View)?;
    let service = DeliveryChallanService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_delivery_challan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<DeliveryChallan>>> {
    current_user.0.require(Resource::DeliveryChallan, Action::View)?;
    let service = DeliveryChallanService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

pub async fn create_delivery_challan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateChallanInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<DeliveryChallan>>)> {
    current_user.0.require(Resource::DeliveryChallan, Action::Create)?;
    let service = DeliveryChallanService::new(state.db, &state.config);
    let document = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_delivery_challan_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<DocumentDetail<DeliveryChallan>>> {
    current_user.0.require(Resource::DeliveryChallan, Action::ChangeStatus)?;
    let service = DeliveryChallanService::new(state.db, &state.config);
    Ok(Json(service.update_status(id, &update).await?))
}

/// Only documents still in their initial state can be deleted
pub async fn delete_delivery_challan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::DeliveryChallan, Action::Delete)?;
    let service = DeliveryChallanService::new(state.db, &state.config);
    service.delete(id).await?;
    Ok(Json(()))
}
