use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_typed_multipart::TypedMultipartError;
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// One rejected field of one upload item.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ItemValidationError {
    /// Zero-based position of the item in the request.
    #[schema(example = 0)]
    pub index: usize,
    /// Field name within the item (`image`, `lat`, `lon`, `angle`, `height`).
    #[schema(example = "image")]
    pub field: String,
    #[schema(example = "Image file is required")]
    pub error: String,
}

impl ItemValidationError {
    pub fn new(index: usize, field: &str, error: impl Into<String>) -> Self {
        Self {
            index,
            field: field.to_string(),
            error: error.into(),
        }
    }
}

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `NOT_FOUND`, `TASK_FAILED`, `STORAGE_ERROR`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Image file is required")]
    pub message: String,
    /// Per-item errors of a rejected upload batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ItemValidationError>>,
    /// Underlying failure of a storage operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            validation_errors: None,
            details: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Upload batch rejected before any side effect.
    ItemValidation(Vec<ItemValidationError>),
    TokenMissing,
    TokenInvalid,
    NotFound(String),
    /// The recognition service reported a failed task.
    TaskFailed(String),
    Storage(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::ItemValidation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    validation_errors: Some(errors),
                    ..ErrorBody::new("VALIDATION_ERROR", "One or more items are invalid")
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_MISSING", "Authentication required"),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_INVALID", "Invalid or expired token"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg)),
            AppError::TaskFailed(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("TASK_FAILED", msg),
            ),
            AppError::Storage(detail) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        details: Some(detail),
                        ..ErrorBody::new("STORAGE_ERROR", "Failed to store uploaded files")
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<TypedMultipartError> for AppError {
    fn from(err: TypedMultipartError) -> Self {
        AppError::Validation(err.to_string())
    }
}
