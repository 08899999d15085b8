//! HTTP handlers for proforma invoices

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::document::{DocumentDetail, DocumentFilter, StatusUpdate};
use crate::services::proforma_invoice::{
    CreateProformaInput, ProformaInvoice, ProformaInvoiceService,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

pub async fn list_proforma_invoices(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<PaginatedResponse<ProformaInvoice>>> {
    current_user.0.require(Resource::ProformaInvoice, Action::View)?;
    let service = ProformaInvoiceService::new(state.db, &state.config);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_proforma_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetail<ProformaInvoice>>> {
    current_user.0.require(Resource::ProformaInvoice, Action::View)?;
    let service = ProformaInvoiceService::new(state.db, &state.config);
    Ok(Json(service.get(id).await?))
}

pub async fn create_proforma_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProformaInput>,
) -> AppResult<(StatusCode, Json<DocumentDetail<ProformaInvoice>>)> {
    current_user.0.require(Resource::ProformaInvoice, Action::Create)?;
    let service = ProformaInvoiceService::new(state.db, &state.config);
    let document = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_proforma_invoice_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<DocumentDetail<ProformaInvoice>>> {
    current_user.0.require(Resource::ProformaInvoice, Action::ChangeStatus)?;
    let service = ProformaInvoiceService::new(state.db, &state.config);
    Ok(Json(service.update_status(id, &update).await?))
}

/// Only documents still in their initial state can be deleted
pub async fn delete_proforma_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::ProformaInvoice, Action::Delete)?;
    let service = ProformaInvoiceService::new(state.db, &state.config);
    service.delete(id).await?;
    Ok(Json(()))
}
