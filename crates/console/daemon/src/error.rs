//! Error types for the console daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use console_storage::StorageError;
use console_types::ConsoleError;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Seed fixture could not be applied
    #[error("Seed error: {0}")]
    Seed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input, missing required comment, action not allowed at step
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No authenticated actor
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Actor may not perform the operation
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Dynamic approver rule resolved to nobody
    #[error("Approver resolution failed: {0}")]
    Resolution(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Resolution(_) => (StatusCode::UNPROCESSABLE_ENTITY, "RESOLUTION_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        match err {
            ConsoleError::Validation(msg) => ApiError::Validation(msg),
            ConsoleError::NotFound(msg) => ApiError::NotFound(msg),
            ConsoleError::Authorization(msg) => ApiError::Forbidden(msg),
            ConsoleError::Conflict(msg) => ApiError::Conflict(msg),
            ConsoleError::Resolution(msg) => ApiError::Resolution(msg),
            ConsoleError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ConsoleError::from(err).into()
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Unauthenticated("test".to_string())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Conflict("test".to_string()).into_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_console_error_mapping() {
        let cases = [
            (ConsoleError::validation("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (ConsoleError::not_found("x"), StatusCode::NOT_FOUND),
            (ConsoleError::unauthorized("x"), StatusCode::FORBIDDEN),
            (ConsoleError::conflict("x"), StatusCode::CONFLICT),
            (ConsoleError::resolution("x"), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            let code = err.code();
            let api = ApiError::from(err);
            assert_eq!(api.status_and_code().0, status);
            assert_eq!(api.status_and_code().1, code);
        }

        let api = ApiError::from(ConsoleError::Storage("disk full".to_string()));
        assert_eq!(
            api.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_conflict_is_409() {
        let api = ApiError::from(StorageError::Conflict("stale".to_string()));
        assert_eq!(api.into_response().status(), StatusCode::CONFLICT);
    }
}
