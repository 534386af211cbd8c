//! Test utilities and common setup.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use frigokpi::api::{self, AppState};
use frigokpi::auth::{AuthConfig, ExternalProfile, ProviderError, SessionInfoProvider};
use frigokpi::db::Database;
use frigokpi::session::{Clock, ManualClock};
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "direction@alsgroupe.fr";
pub const ADMIN_PASSWORD: &str = "admin-pw";

/// Provider that answers from a fixed table of session ids.
#[derive(Default)]
pub struct FakeProvider {
    profiles: HashMap<String, ExternalProfile>,
}

impl FakeProvider {
    pub fn with(mut self, session_id: &str, email: &str, name: &str) -> Self {
        self.profiles.insert(
            session_id.to_string(),
            ExternalProfile {
                email: email.to_string(),
                name: name.to_string(),
                picture: None,
            },
        );
        self
    }
}

#[async_trait]
impl SessionInfoProvider for FakeProvider {
    async fn fetch_profile(&self, session_id: &str) -> Result<ExternalProfile, ProviderError> {
        match session_id {
            "provider-down" => Err(ProviderError::Unreachable("connection refused".to_string())),
            _ => self
                .profiles
                .get(session_id)
                .cloned()
                .ok_or(ProviderError::Rejected(404)),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    /// Send a request and return status, headers and JSON body.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (parts.status, parts.headers, json)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, _, body) = self
            .request(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        bcrypt_cost: 4,
        cookie_secure: false,
        ..AuthConfig::default()
    }
}

/// Create a test application with all services initialized.
pub async fn test_app() -> TestApp {
    test_app_with_config(test_auth_config()).await
}

pub async fn test_app_with_config(config: AuthConfig) -> TestApp {
    let db = Database::in_memory()
        .await
        .expect("Failed to create test database");

    let provider = FakeProvider::default()
        .with("sid-alice", "alice.ext@x.com", "Alice Ext")
        .with("sid-alice-2", "Alice.Ext@X.com", "Alice Ext")
        .with("sid-bob", "bob@x.com", "");

    let clock = Arc::new(ManualClock::default());
    let state = AppState::assemble(
        &db,
        config,
        Some(Arc::new(provider) as Arc<dyn SessionInfoProvider>),
        clock.clone() as Arc<dyn Clock>,
    );

    state
        .users
        .ensure_admin(ADMIN_EMAIL, "Direction", ADMIN_PASSWORD)
        .await
        .expect("Failed to create admin");

    TestApp {
        router: api::create_router(state.clone()),
        state,
        clock,
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}
