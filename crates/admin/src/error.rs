//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::FieldErrors;
use crate::services::{RuleError, StorageError};

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint or stale version.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<RuleError> for AppError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::NotFound { .. } => Self::NotFound(err.to_string()),
            RuleError::Conflict(message) => Self::Conflict(message),
            RuleError::Unsupported(message) => Self::BadRequest(message),
            RuleError::Storage(e) => Self::Storage(e),
            RuleError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Storage(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation(errors) => json!({ "errors": errors }),
            Self::Database(_) => json!({ "error": "Internal server error" }),
            Self::Storage(_) => json!({ "error": "Object storage error" }),
            Self::NotFound(message) | Self::Conflict(message) | Self::BadRequest(message) => {
                json!({ "error": message })
            }
        };

        (status, Json(body)).into_response()
    }
}
