//! Unified API error handling with structured responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;

/// API error type with structured responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Email already registered")]
    DuplicateIdentity,

    #[error("External login failed: {0}")]
    ExternalRejected(String),

    #[error("External login failed: {0}")]
    ExternalUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::DuplicateIdentity | Self::ExternalRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ExternalUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::DuplicateIdentity => "DUPLICATE_IDENTITY",
            Self::ExternalRejected(_) | Self::ExternalUnavailable(_) => {
                "EXTERNAL_EXCHANGE_FAILED"
            }
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message sent to the client. Internal detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        match &self {
            ApiError::Internal(msg) => {
                error!(error_code = code, message = %msg, "API error");
            }
            ApiError::ExternalUnavailable(msg) => {
                warn!(error_code = code, message = %msg, "External provider unavailable");
            }
            _ => {
                tracing::debug!(error_code = code, message = %self, "Client error");
            }
        }

        let body = ErrorResponse {
            error: self.public_message(),
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Convert auth errors to API errors.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Unauthenticated => ApiError::Unauthorized("Not authenticated".to_string()),
            AuthError::Forbidden(action) => ApiError::Forbidden(action.to_string()),
            AuthError::DuplicateIdentity => ApiError::DuplicateIdentity,
            AuthError::InvalidInput(msg) => ApiError::BadRequest(msg),
            AuthError::UserNotFound => ApiError::NotFound("user".to_string()),
            AuthError::ExternalExchangeFailed(failure) if failure.is_client_side() => {
                ApiError::ExternalRejected(failure.to_string())
            }
            AuthError::ExternalExchangeFailed(failure) => {
                ApiError::ExternalUnavailable(failure.to_string())
            }
            AuthError::StorageUnavailable(msg) => {
                ApiError::Internal(format!("Storage unavailable: {}", msg))
            }
            AuthError::Internal(msg) => {
                ApiError::Internal(format!("Authentication error: {}", msg))
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
