//! HTTP Error Handling
//!
//! 业务错误统一返回 HTTP 200 + 信封 `{code, message, data: null}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ApplicationError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// 信封错误码
pub mod code {
    pub const SUCCESS: i32 = 10200;
    pub const VALIDATION: i32 = 10400;
    pub const SCOPE: i32 = 10403;
    pub const NOT_FOUND: i32 = 10404;
    pub const CONFLICT: i32 = 10409;
    pub const INTERNAL_ERROR: i32 = 10500;
    pub const PROVIDER_UNAVAILABLE: i32 = 10503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Scope(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn code(&self) -> i32 {
        match self {
            ApiError::BadRequest(_) => code::VALIDATION,
            ApiError::Scope(_) => code::SCOPE,
            ApiError::NotFound(_) => code::NOT_FOUND,
            ApiError::Conflict(_) => code::CONFLICT,
            ApiError::Internal(_) => code::INTERNAL_ERROR,
            ApiError::ServiceUnavailable(_) => code::PROVIDER_UNAVAILABLE,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Scope(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        match &self {
            ApiError::BadRequest(msg) => {
                tracing::warn!(code = code, error = %msg, "Bad request");
            }
            ApiError::Scope(msg) => {
                tracing::warn!(code = code, error = %msg, "Rule scope mismatch");
            }
            ApiError::NotFound(msg) => {
                tracing::warn!(code = code, error = %msg, "Resource not found");
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(code = code, error = %msg, "Resource conflict");
            }
            ApiError::Internal(msg) => {
                tracing::error!(code = code, error = %msg, "Internal server error");
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(code = code, error = %msg, "Service unavailable");
            }
        }

        (StatusCode::OK, Json(ErrorResponse::new(code, self.message()))).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{} not found: {}", resource_type, id))
            }
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::Conflict(msg) => ApiError::Conflict(msg),
            ApplicationError::ScopeError(msg) => ApiError::Scope(msg),
            ApplicationError::ExternalServiceError(msg) => ApiError::ServiceUnavailable(msg),
            ApplicationError::RepositoryError(msg)
            | ApplicationError::StorageError(msg)
            | ApplicationError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_application_error_codes() {
        let cases = [
            (ApplicationError::validation("x"), code::VALIDATION),
            (ApplicationError::ScopeError("x".into()), code::SCOPE),
            (ApplicationError::not_found("Task", Uuid::new_v4()), code::NOT_FOUND),
            (ApplicationError::conflict("x"), code::CONFLICT),
            (ApplicationError::RepositoryError("x".into()), code::INTERNAL_ERROR),
            (ApplicationError::ExternalServiceError("x".into()), code::PROVIDER_UNAVAILABLE),
            (
                ApplicationError::from(crate::application::ports::JobError::QueueFull),
                code::PROVIDER_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).code(), expected);
        }
    }

    #[tokio::test]
    async fn test_error_envelope_is_http_200() {
        let response = ApiError::Conflict("sentence busy".into()).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 10409);
        assert_eq!(json["message"], "sentence busy");
        assert!(json["data"].is_null());
    }
}
