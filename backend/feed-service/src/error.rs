/// Error types for feed-service
///
/// Service errors are converted to JSON HTTP responses for API clients.
/// Fan-out failures have their own type in `services::fanout` because they
/// never reach a client.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown, foreign or malformed category id
    #[error("Category {0} does not belong to the author")]
    InvalidCategory(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidCategory(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ServiceError::InvalidCategory(category_id) => serde_json::json!({
                "name": "INVALID_CATEGORY",
                "payload": category_id,
            }),
            ServiceError::Validation(msg) => serde_json::json!({
                "name": "VALIDATION_ERROR",
                "payload": msg,
            }),
            // Storage details stay in the logs
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "database error while handling request");
                serde_json::json!({
                    "error": "Database error",
                    "status": status.as_u16(),
                })
            }
            other => serde_json::json!({
                "error": other.to_string(),
                "status": status.as_u16(),
            }),
        };

        HttpResponse::build(status).json(body)
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
