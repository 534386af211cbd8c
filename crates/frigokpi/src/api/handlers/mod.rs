//! API request handlers.
//!
//! - `auth`: login, registration, external login, logout, current identity, guard checks
//! - `admin`: identity administration

pub mod admin;
pub mod auth;

use axum::Json;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Parse an optional enum field from a request, as a 400 on failure.
pub(crate) fn parse_optional<T>(value: Option<&str>) -> Result<Option<T>, crate::api::ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(crate::api::ApiError::bad_request),
    }
}
