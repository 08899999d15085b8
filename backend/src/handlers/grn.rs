//! HTTP handlers for goods receipt notes (GRN)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::document::{DocumentDetail, DocumentFilter, StatusUpdate};
use crate::services::grn::{CreateGrnInput, Grn, GrnService, InspectGrnInput};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_grns(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<Grn>>> {
    current_user.0.require(Resource::Grn, Action::View)?;
    let service = GrnService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_grn(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<Grn>>> {
    current_user.0.require(Resource::Grn, Action::View)?;
    let service = GrnService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

pub async fn create_grn(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateGrnInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<Grn>>)> {
    current_user.0.require(Resource::Grn, Action::Create)?;
    let service = GrnService::new(state.db, &state.config);
    let document = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_grn_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<DocumentDetail<Grn>>> {
    current_user.0.require(Resource::Grn, Action::ChangeStatus)?;
    let service = GrnService::new(state.db, &state.config);
    Ok(Json(service.update_status(id, &update).await?))
}

/// Only documents still in their initial state can be deleted
pub async fn delete_grn(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::Grn, Action::Delete)?;
    let service = GrnService::new(state.db, &state.config);
    service.delete(id).await?;
    Ok(Json(()))
}

/// Record per-line accepted quantities; moves the GRN to Inspected
pub async fn inspect_grn(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<InspectGrnInput>,
) -> AppResult<Json<DocumentDetail<Grn>>> {
    current_user.0.require(Resource::Grn, Action::ChangeStatus)?;
    let service = GrnService::new(state.db, &state.config);
    Ok(Json(service.inspect(id, input).await?))
}
