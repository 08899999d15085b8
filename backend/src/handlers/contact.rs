//! HTTP handlers for contacts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::contact::{
    Contact, ContactQuery, ContactService, CreateContactInput, UpdateContactInput,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_contacts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ContactQuery>,
) -> AppResult<Json<PaginatedResponse<Contact>>> {
    current_user.0.require(Resource::Contact, Action::View)?;
    let service = ContactService::new(state.db);
    Ok(Json(service.list(&query).await?))
}

pub async fn get_contact(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(contact_id): Path<Uuid>,
) -> AppResult<Json<Contact>> {
    current_user.0.require(Resource::Contact, Action::View)?;
    let service = ContactService::new(state.db);
    Ok(Json(service.get(contact_id).await?))
}

pub async fn create_contact(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateContactInput>,
) -> AppResult<(StatusCode, Json<Contact>)> {
    current_user.0.require(Resource::Contact, Action::Create)?;
    let service = ContactService::new(state.db);
    let contact = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(contact_id): Path<Uuid>,
    Json(input): Json<UpdateContactInput>,
) -> AppResult<Json<Contact>> {
    current_user.0.require(Resource::Contact, Action::Edit)?;
    let service = ContactService::new(state.db);
    Ok(Json(service.update(contact_id, input).await?))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(contact_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::Contact, Action::Delete)?;
    let service = ContactService::new(state.db);
    service.delete(contact_id).await?;
    Ok(Json(()))
}
