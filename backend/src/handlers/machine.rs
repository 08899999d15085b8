//! HTTP handlers for production machines

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::machine::{CreateMachineInput, Machine, MachineService, UpdateMachineInput};
use crate::AppState;
use shared::{Action, Resource};

pub async fn list_machines(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Machine>>> {
    current_user.0.require(Resource::Machine, Action::View)?;
    let service = MachineService::new(state.db, &state.config);
    Ok(Json(service.list().await?))
}

pub async fn get_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
) -> AppResult<Json<Machine>> {
    current_user.0.require(Resource::Machine, Action::View)?;
    let service = MachineService::new(state.db, &state.config);
    Ok(Json(service.get(machine_id).await?))
}

pub async fn create_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMachineInput>,
) -> AppResult<(StatusCode, Json<Machine>)> {
    current_user.0.require(Resource::Machine, Action::Create)?;
    let service = MachineService::new(state.db, &state.config);
    let machine = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(machine)))
}

pub async fn update_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
    Json(input): Json<UpdateMachineInput>,
) -> AppResult<Json<Machine>> {
    current_user.0.require(Resource::Machine, Action::Edit)?;
    let service = MachineService::new(state.db, &state.config);
    Ok(Json(service.update(machine_id, input).await?))
}

pub async fn delete_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::Machine, Action::Delete)?;
    let service = MachineService::new(state.db, &state.config);
    service.delete(machine_id).await?;
    Ok(Json(()))
}
