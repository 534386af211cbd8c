//! API integration tests.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use serde_json::{Value, json};

mod common;
use common::{ADMIN_EMAIL, TestApp, empty_request, json_request, test_app, test_app_with_config};

async fn register(app: &TestApp, body: Value) -> (StatusCode, Value) {
    let (status, _, json) = app
        .request(json_request(Method::POST, "/api/auth/register", None, body))
        .await;
    (status, json)
}

async fn me(app: &TestApp, token: &str) -> (StatusCode, Value) {
    let (status, _, json) = app
        .request(empty_request(Method::GET, "/api/auth/me", Some(token)))
        .await;
    (status, json)
}

async fn register_alice(app: &TestApp) -> Value {
    let (status, body) = register(
        app,
        json!({
            "email": "alice@x.com",
            "password": "pw1",
            "name": "Alice",
            "role": "DevCo_IDF",
            "region": "IDF"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app().await;
    let (status, _, body) = app
        .request(empty_request(Method::GET, "/api/health", None))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = test_app().await;
    let registered = register_alice(&app).await;
    assert!(registered["token"].is_string());
    assert_eq!(registered["user"]["role"], "DevCo_IDF");
    assert!(registered["user"].get("password_hash").is_none());

    let token = app.login("alice@x.com", "pw1").await;
    assert_ne!(token, registered["token"].as_str().unwrap());

    let (status, body) = me(&app, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@x.com");
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["role"], "DevCo_IDF");
    assert_eq!(body["region"], "IDF");
    assert!(body["division"].is_null());
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = test_app().await;
    register_alice(&app).await;

    let token = app.login("  ALICE@X.com ", "pw1").await;
    let (status, _) = me(&app, &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = test_app().await;
    register_alice(&app).await;

    let (wrong_status, _, wrong_body) = app
        .request(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "alice@x.com", "password": "wrong" }),
        ))
        .await;
    let (unknown_status, _, unknown_body) = app
        .request(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "nobody@x.com", "password": "pw1" }),
        ))
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = test_app().await;
    register_alice(&app).await;

    let (status, headers, body) = app
        .request(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "alice@x.com", "password": "pw1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let token = body["token"].as_str().unwrap();
    assert!(cookie.starts_with(&format!("session_token={token};")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=604800"));

    let response = app
        .request(
            Request::builder()
                .method(Method::GET)
                .uri("/api/auth/me")
                .header(header::COOKIE, format!("session_token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.2["email"], "alice@x.com");
}

#[tokio::test]
async fn test_session_expires() {
    let app = test_app().await;
    register_alice(&app).await;
    let token = app.login("alice@x.com", "pw1").await;

    app.clock.advance(Duration::days(7) - Duration::seconds(1));
    assert_eq!(me(&app, &token).await.0, StatusCode::OK);

    app.clock.advance(Duration::seconds(1));
    let (status, body) = me(&app, &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = test_app().await;

    let (status, _, _) = app
        .request(empty_request(Method::GET, "/api/auth/me", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = me(&app, "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .request(
            Request::builder()
                .method(Method::GET)
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Basic YWxpY2U6cHcx")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = test_app().await;
    register_alice(&app).await;

    let (status, body) = register(
        &app,
        json!({ "email": "Alice@X.com", "password": "other", "name": "Alice 2" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_IDENTITY");

    let (status, _) = register(
        &app,
        json!({ "email": "carol@x.com", "password": "pw", "name": "Carol", "role": "Stagiaire" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = register(
        &app,
        json!({ "email": "not-an-email", "password": "pw", "name": "Carol" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = register(
        &app,
        json!({ "email": "carol@x.com", "password": "", "name": "Carol" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_defaults_role_and_refuses_admin() {
    let app = test_app().await;

    let (status, body) = register(
        &app,
        json!({ "email": "dan@x.com", "password": "pw", "name": "Dan" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "DevCo_IDF");

    let (status, _) = register(
        &app,
        json!({ "email": "eve@x.com", "password": "pw", "name": "Eve", "role": "Admin_Directeur" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_can_be_disabled() {
    let mut config = common::test_auth_config();
    config.allow_self_registration = false;
    let app = test_app_with_config(config).await;

    let (status, body) = register(
        &app,
        json!({ "email": "dan@x.com", "password": "pw", "name": "Dan" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_external_exchange_reuses_identity() {
    let app = test_app().await;

    let (status, _, first) = app
        .request(json_request(
            Method::POST,
            "/api/auth/google-session",
            None,
            json!({ "session_id": "sid-alice" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["user"]["email"], "alice.ext@x.com");
    assert_eq!(first["user"]["role"], "DevCo_IDF");

    let (status, _, second) = app
        .request(json_request(
            Method::POST,
            "/api/auth/google-session",
            None,
            json!({ "session_id": "sid-alice-2" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["user"]["id"], second["user"]["id"]);
    assert_ne!(first["session_token"], second["session_token"]);

    for body in [&first, &second] {
        let token = body["session_token"].as_str().unwrap();
        assert_eq!(me(&app, token).await.0, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_external_exchange_failures() {
    let app = test_app().await;

    let (status, _, body) = app
        .request(json_request(
            Method::POST,
            "/api/auth/google-session",
            None,
            json!({ "session_id": "unknown-sid" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EXTERNAL_EXCHANGE_FAILED");

    let (status, _, body) = app
        .request(json_request(
            Method::POST,
            "/api/auth/google-session",
            None,
            json!({ "session_id": "provider-down" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "EXTERNAL_EXCHANGE_FAILED");

    let users = app
        .state
        .users
        .list_users(Default::default())
        .await
        .unwrap();
    assert_eq!(users.len(), 1, "only the bootstrap admin exists");
}

#[tokio::test]
async fn test_external_session_id_cannot_be_replayed() {
    let app = test_app().await;
    let exchange = || {
        json_request(
            Method::POST,
            "/api/auth/google-session",
            None,
            json!({ "session_id": "sid-bob" }),
        )
    };

    let (status, _, body) = app.request(exchange()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "bob");

    let (status, _, _) = app.request(exchange()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_is_idempotent_and_scoped_to_one_session() {
    let app = test_app().await;
    register_alice(&app).await;
    let first = app.login("alice@x.com", "pw1").await;
    let second = app.login("alice@x.com", "pw1").await;

    for _ in 0..2 {
        let (status, headers, body) = app
            .request(empty_request(Method::POST, "/api/auth/logout", Some(&first)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out");
        let cookie = headers
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.contains("Max-Age=0"));
    }

    assert_eq!(me(&app, &first).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(me(&app, &second).await.0, StatusCode::OK);

    let (status, _, _) = app
        .request(empty_request(Method::POST, "/api/auth/logout", None))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_authorize_endpoint() {
    let app = test_app().await;
    register_alice(&app).await;
    let token = app.login("alice@x.com", "pw1").await;

    let (status, _, body) = app
        .request(json_request(
            Method::POST,
            "/api/auth/authorize",
            Some(&token),
            json!({ "action": "read", "scope": { "resource": "account", "division": "ALS PHARMA" } }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);

    let (status, _, body) = app
        .request(json_request(
            Method::POST,
            "/api/auth/authorize",
            Some(&token),
            json!({ "action": "export", "scope": { "resource": "dashboard" } }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(body["error"].as_str().unwrap().contains("export"));

    let (status, _, _) = app
        .request(json_request(
            Method::POST,
            "/api/auth/authorize",
            Some(&token),
            json!({
                "action": "update",
                "scope": { "resource": "opportunity", "owner_id": "someone-else" }
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let (status, _, _) = app
        .request(json_request(
            Method::POST,
            "/api/auth/authorize",
            Some(&admin),
            json!({ "action": "export", "scope": { "resource": "dashboard" } }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_division_region_scope() {
    let mut config = common::test_auth_config();
    config.read_scope = frigokpi::auth::ReadScope::DivisionRegion;
    let app = test_app_with_config(config).await;
    register_alice(&app).await;
    let token = app.login("alice@x.com", "pw1").await;

    let (status, _, _) = app
        .request(json_request(
            Method::POST,
            "/api/auth/authorize",
            Some(&token),
            json!({ "action": "read", "scope": { "resource": "account", "region": "HDF" } }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app
        .request(empty_request(
            Method::GET,
            "/api/auth/record-filter?resource=opportunity",
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["region"], "IDF");
    assert!(body["division"].is_null());
    assert!(body["owner_id"].is_string());
}

#[tokio::test]
async fn test_record_filter_under_open_scope() {
    let app = test_app().await;
    let registered = register_alice(&app).await;
    let token = app.login("alice@x.com", "pw1").await;

    let (status, _, body) = app
        .request(empty_request(
            Method::GET,
            "/api/auth/record-filter?resource=opportunity",
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_id"], registered["user"]["id"]);
    assert!(body["region"].is_null());

    let (status, _, body) = app
        .request(empty_request(
            Method::GET,
            "/api/auth/record-filter?resource=account",
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["region"], "IDF");
    assert!(body["owner_id"].is_null());

    let admin = app.admin_token().await;
    let (_, _, body) = app
        .request(empty_request(
            Method::GET,
            "/api/auth/record-filter?resource=account",
            Some(&admin),
        ))
        .await;
    assert!(body["region"].is_null());
    assert!(body["owner_id"].is_null());
}

#[tokio::test]
async fn test_admin_routes_are_admin_only() {
    let app = test_app().await;
    register_alice(&app).await;
    let token = app.login("alice@x.com", "pw1").await;

    let (status, _, body) = app
        .request(empty_request(Method::GET, "/api/admin/users", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _, _) = app
        .request(empty_request(Method::GET, "/api/admin/users", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_manages_identities() {
    let app = test_app().await;
    let admin = app.admin_token().await;

    let (status, _, created) = app
        .request(json_request(
            Method::POST,
            "/api/admin/users",
            Some(&admin),
            json!({
                "email": "fanny@x.com",
                "name": "Fanny",
                "password": "fanny-pw",
                "role": "Directrice_Clientele",
                "division": "ALS FRESH FOOD"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["division"], "ALS FRESH FOOD");
    let fanny_id = created["id"].as_str().unwrap().to_string();

    let (status, _, listed) = app
        .request(empty_request(
            Method::GET,
            "/api/admin/users?role=Directrice_Clientele",
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _, updated) = app
        .request(json_request(
            Method::PUT,
            &format!("/api/admin/users/{fanny_id}"),
            Some(&admin),
            json!({ "role": "Assistante_Clientele", "division": null, "region": "HDF" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["role"], "Assistante_Clientele");
    assert!(updated["division"].is_null());
    assert_eq!(updated["region"], "HDF");

    let fanny = app.login("fanny@x.com", "fanny-pw").await;
    let (status, body) = me(&app, &fanny).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Assistante_Clientele");

    let (status, _, _) = app
        .request(empty_request(
            Method::DELETE,
            &format!("/api/admin/users/{fanny_id}"),
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me(&app, &fanny).await.0, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .request(empty_request(
            Method::DELETE,
            &format!("/api/admin/users/{fanny_id}"),
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let (_, body) = me(&app, &admin).await;
    assert_eq!(body["email"], ADMIN_EMAIL);
    let admin_id = body["id"].as_str().unwrap();

    let (status, _, _) = app
        .request(empty_request(
            Method::DELETE,
            &format!("/api/admin/users/{admin_id}"),
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(me(&app, &admin).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_create_rejects_unknown_role() {
    let app = test_app().await;
    let admin = app.admin_token().await;

    let (status, _, _) = app
        .request(json_request(
            Method::POST,
            "/api/admin/users",
            Some(&admin),
            json!({ "email": "gus@x.com", "name": "Gus", "role": "Intern" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
