//! Authentication and authorization errors.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::guard::Action;
use crate::db::StoreError;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Why an external identity exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeFailure {
    /// The provider refused the session identifier.
    Rejected,
    /// The identifier was already exchanged.
    Replayed,
    /// The provider could not be reached or timed out.
    Unreachable,
    /// The provider answered with something we could not use.
    Malformed,
    /// External login is not configured.
    Disabled,
}

impl ExchangeFailure {
    /// Failures caused by the identifier itself, as opposed to the provider.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            ExchangeFailure::Rejected | ExchangeFailure::Replayed | ExchangeFailure::Disabled
        )
    }
}

impl std::fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeFailure::Rejected => write!(f, "session rejected by provider"),
            ExchangeFailure::Replayed => write!(f, "session already used"),
            ExchangeFailure::Unreachable => write!(f, "provider unreachable"),
            ExchangeFailure::Malformed => write!(f, "malformed provider response"),
            ExchangeFailure::Disabled => write!(f, "external login disabled"),
        }
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The external provider handoff could not be completed.
    #[error("external login failed: {0}")]
    ExternalExchangeFailed(ExchangeFailure),

    /// Missing, unknown, or expired session.
    #[error("not authenticated")]
    Unauthenticated,

    /// The guard denied the action.
    #[error("forbidden: {0}")]
    Forbidden(Action),

    /// Email already registered.
    #[error("email already registered")]
    DuplicateIdentity,

    /// Malformed input (unknown role, bad email, empty password).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Target identity does not exist (administrative operations only).
    #[error("user not found")]
    UserNotFound,

    /// Storage failure. Fatal to the request, never retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AuthError::DuplicateIdentity,
            StoreError::Unavailable(e) => AuthError::StorageUnavailable(e.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        crate::api::ApiError::from(self).into_response()
    }
}
