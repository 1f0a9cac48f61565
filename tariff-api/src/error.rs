use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tariff_core::{CoreError, FieldError};
use tariff_shared::ConflictReport;

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    NotFoundError(String),
    /// Write withheld until a resolution strategy is chosen
    ConflictError(Box<ConflictReport>),
    /// Retryable by the caller
    ConcurrentModification(String),
    /// Retryable by the caller
    AtomicWriteFailure(String),
    DeadlineExceeded,
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![FieldError::new(field, message)])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::ValidationError(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "fields": fields }),
            ),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ConflictError(report) => (
                StatusCode::CONFLICT,
                json!({ "error": "Conflict requires resolution", "conflict": *report }),
            ),
            AppError::ConcurrentModification(msg) => (
                StatusCode::CONFLICT,
                json!({ "error": msg, "retryable": true }),
            ),
            AppError::AtomicWriteFailure(msg) => {
                tracing::error!("Atomic write failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Write failed and was rolled back", "retryable": true }),
                )
            }
            AppError::DeadlineExceeded => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({ "error": "Deadline exceeded before commit", "retryable": true }),
            ),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(fields) => AppError::ValidationError(fields),
            CoreError::ProductNotPriced(id) => {
                AppError::NotFoundError(format!("Product not priced: {}", id))
            }
            CoreError::NotFound(what) => AppError::NotFoundError(format!("Not found: {}", what)),
            CoreError::ConflictRequiresResolution(report) => AppError::ConflictError(report),
            CoreError::ConcurrentModification(msg) => AppError::ConcurrentModification(msg),
            CoreError::AtomicWriteFailure(msg) => AppError::AtomicWriteFailure(msg),
            CoreError::DeadlineExceeded => AppError::DeadlineExceeded,
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
