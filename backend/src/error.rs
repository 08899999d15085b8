//! Error handling for the Mart ERP server
//!
//! Every failure reaches the client as a status code plus `{ "message": ... }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::{InspectionError, NumberError, StockError, TransitionError, UnknownStatus};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    // Document lifecycle errors
    #[error("Cannot change status from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("{document} can only be deleted while in {initial} status")]
    IllegalDeleteState { document: String, initial: String },

    #[error("Could not allocate a unique {0} number")]
    DuplicateDocumentNumber(String),

    #[error("A record with this {0} already exists")]
    DuplicateEntry(String),

    #[error("Insufficient stock for {item}: {available} available, {requested} requested")]
    InsufficientStock {
        item: String,
        available: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },

    // Authentication errors
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Requires {0} role")]
    Forbidden(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::InvalidStatusTransition { .. }
            | AppError::IllegalDeleteState { .. }
            | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateDocumentNumber(_) | AppError::DuplicateEntry(_) => {
                StatusCode::CONFLICT
            }
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Error: {:?}", self);
            "An internal server error occurred".to_string()
        } else {
            tracing::debug!("Request failed: {}", self);
            self.to_string()
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        AppError::InvalidStatusTransition {
            from: e.from,
            to: e.to,
        }
    }
}

impl From<UnknownStatus> for AppError {
    fn from(e: UnknownStatus) -> Self {
        AppError::validation("status", e.to_string())
    }
}

impl From<InspectionError> for AppError {
    fn from(e: InspectionError) -> Self {
        AppError::validation("lines", e.to_string())
    }
}

impl From<NumberError> for AppError {
    fn from(e: NumberError) -> Self {
        match e {
            NumberError::Exhausted(bucket) => AppError::DuplicateDocumentNumber(bucket),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StockError> for AppError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::Insufficient {
                item_id,
                available,
                requested,
            } => AppError::InsufficientStock {
                item: item_id.to_string(),
                available,
                requested,
            },
        }
    }
}

/// Whether a database error is a unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
