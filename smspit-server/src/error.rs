use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use smspit_store::StoreError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required field is missing or empty
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Missing or wrong shared secret
    #[error("Unauthorized")]
    Auth,

    /// Payload could not be decoded
    #[error("{0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        ApiError::Decode(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Auth => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Auth => "AUTH_ERROR",
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, error_code = self.error_code(), "Server error occurred");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error_code = self.error_code(), "Authentication failed");
        } else {
            tracing::debug!(error = %self, error_code = self.error_code(), "Client error occurred");
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": message,
            "error_code": self.error_code(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::decode("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Auth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let response = ApiError::internal("lock poisoned at store.rs").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_error_is_internal() {
        let err: ApiError = StoreError::DuplicateId("msg_1".to_string()).into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
