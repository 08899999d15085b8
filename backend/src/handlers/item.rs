//! HTTP handlers for item master data

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::item::{
    BulkUploadReport, CreateItemInput, Item, ItemQuery, ItemService, UpdateItemInput,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

/// List items, optionally searching or keeping only low-stock ones
pub async fn list_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<PaginatedResponse<Item>>> {
    current_user.0.require(Resource::Item, Action::View)?;
    let service = ItemService::new(state.db);
    Ok(Json(service.list(&query).await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    current_user.0.require(Resource::Item, Action::View)?;
    let service = ItemService::new(state.db);
    Ok(Json(service.get(item_id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<(StatusCode, Json<Item>)> {
    current_user.0.require(Resource::Item, Action::Create)?;
    let service = ItemService::new(state.db);
    let item = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<Item>> {
    current_user.0.require(Resource::Item, Action::Edit)?;
    let service = ItemService::new(state.db);
    Ok(Json(service.update(item_id, input).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::Item, Action::Delete)?;
    let service = ItemService::new(state.db);
    service.delete(item_id).await?;
    Ok(Json(()))
}

/// Upsert items from the first file field of a multipart upload
pub async fn bulk_upload_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<BulkUploadReport>> {
    current_user.0.require(Resource::Item, Action::Import)?;

    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("file", e.to_string()))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation("file", e.to_string()))?;
            data = Some(bytes);
            break;
        }
    }

    let data = data.ok_or_else(|| AppError::validation("file", "A CSV file is required"))?;

    let service = ItemService::new(state.db);
    Ok(Json(service.bulk_upload(&data).await?))
}
