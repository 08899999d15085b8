//! HTTP handlers for accounts and expenses

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::finance::{
    Account, CreateAccountInput, CreateExpenseInput, Expense, ExpenseQuery, ExpenseReceipt,
    FinanceService,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Resource};

// ============================================================================
// Accounts
// ============================================================================

pub async fn list_accounts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Account>>> {
    current_user.0.require(Resource::Account, Action::View)?;
    let service = FinanceService::new(state.db, &state.config);
    Ok(Json(service.list_accounts().await?))
}

pub async fn get_account(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(account_id): Path<Uuid>,
) -> AppResult<Json<Account>> {
    current_user.0.require(Resource::Account, Action::View)?;
    let service = FinanceService::new(state.db, &state.config);
    Ok(Json(service.get_account(account_id).await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateAccountInput>,
) -> AppResult<(StatusCode, Json<Account>)> {
    current_user.0.require(Resource::Account, Action::Create)?;
    let service = FinanceService::new(state.db, &state.config);
    let account = service.create_account(input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

// ============================================================================
// Expenses
// ============================================================================

pub async fn list_expenses(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ExpenseQuery>,
) -> AppResult<Json<PaginatedResponse<Expense>>> {
    current_user.0.require(Resource::Expense, Action::View)?;
    let service = FinanceService::new(state.db, &state.config);
    Ok(Json(service.list_expenses(&query).await?))
}

pub async fn get_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<Expense>> {
    current_user.0.require(Resource::Expense, Action::View)?;
    let service = FinanceService::new(state.db, &state.config);
    Ok(Json(service.get_expense(expense_id).await?))
}

pub async fn create_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateExpenseInput>,
) -> AppResult<(StatusCode, Json<ExpenseReceipt>)> {
    current_user.0.require(Resource::Expense, Action::Create)?;
    let service = FinanceService::new(state.db, &state.config);
    let receipt = service
        .create_expense(input, current_user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Deleting an expense returns its amount to the account
pub async fn delete_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require(Resource::Expense, Action::Delete)?;
    let service = FinanceService::new(state.db, &state.config);
    service.delete_expense(expense_id).await?;
    Ok(Json(()))
}
