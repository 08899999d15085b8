//! HTTP handlers for production batches

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::document::{DocumentDetail, DocumentFilter};
use crate::services::production::{
    CreateProductionInput, Production, ProductionService, ProductionStatusUpdate,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_productions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<Production>>> {
    current_user.0.require(Resource::Production, Action::View)?;
    let service = ProductionService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<Production>>> {
    current_user.0.require(Resource::Production, Action::View)?;
    let service = ProductionService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

pub async fn create_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductionInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<Production>>)> {
    current_user.0.require(Resource::Production, Action::Create)?;
    let service = ProductionService::new(state.db, &state.config);
    let document = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_production_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<ProductionStatusUpdate>,
) -> AppResult<Json<DocumentDetail<Production>>> {
    current_user.0.require(Resource::Production, Action::ChangeStatus)?;
    let service = ProductionService::new(state.db, &state.config);
    Ok(Json(service.update_status(id, &update).await?))
}

/// Only documents still in their initial state can be deleted
pub async fn delete_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::Production, Action::Delete)?;
    let service = ProductionService::new(state.db, &state.config);
    service.delete(id).await?;
    Ok(Json(()))
}
