//! Authentication handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{MessageResponse, parse_optional};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::{
    Action, AuthError, Credential, CurrentUser, RecordFilter, ResourceKind, Scope,
    session_token_from_headers,
};
use crate::user::{CreateUserRequest, Division, Region, UserInfo, UserRole};

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login and registration response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<String>,
    pub division: Option<String>,
    pub region: Option<String>,
}

/// External login request, carrying the id from the redirect fragment.
#[derive(Debug, Deserialize)]
pub struct ExternalSessionRequest {
    pub session_id: String,
}

/// External login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExternalSessionResponse {
    pub user: UserInfo,
    pub session_token: String,
}

/// Guard check request.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub action: Action,
    pub scope: Scope,
}

/// Guard check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub allowed: bool,
}

/// Record filter query.
#[derive(Debug, Deserialize)]
pub struct RecordFilterQuery {
    pub resource: ResourceKind,
}

/// Login with email and password.
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, session) = state
        .authenticator
        .authenticate(Credential::Password {
            email: request.email,
            password: request.password,
        })
        .await?;

    let cookie = state.auth.session_cookie(&session.token);
    info!(user_id = %user.id, "User logged in successfully");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(TokenResponse {
            token: session.token,
            user: user.into(),
        }),
    ))
}

/// Self-registration with a password.
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let config = state.auth.config();
    if !config.allow_self_registration {
        return Err(ApiError::forbidden("registration is disabled"));
    }

    let role = parse_optional::<UserRole>(request.role.as_deref())?.unwrap_or(UserRole::DevCoIdf);
    if role == UserRole::AdminDirecteur && !config.allow_admin_self_registration {
        warn!("Self-registration requested the admin role");
        return Err(ApiError::bad_request(
            "role Admin_Directeur cannot be self-assigned",
        ));
    }

    let user = state
        .users
        .create_user(CreateUserRequest {
            email: request.email,
            name: request.name,
            password: Some(request.password),
            role,
            division: parse_optional::<Division>(request.division.as_deref())?,
            region: parse_optional::<Region>(request.region.as_deref())?,
        })
        .await?;

    let session = state.authenticator.start_session(&user).await?;
    let cookie = state.auth.session_cookie(&session.token);
    info!(user_id = %user.id, role = %user.role, "User registered successfully");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(TokenResponse {
            token: session.token,
            user: user.into(),
        }),
    ))
}

/// Exchange an external provider session id for a local session.
#[instrument(skip(state, request))]
pub async fn google_session(
    State(state): State<AppState>,
    Json(request): Json<ExternalSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, session) = state
        .authenticator
        .authenticate(Credential::ExternalProvider {
            session_id: request.session_id,
        })
        .await?;

    let cookie = state.auth.session_cookie(&session.token);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(ExternalSessionResponse {
            user: user.into(),
            session_token: session.token,
        }),
    ))
}

/// Current identity.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserInfo> {
    Json(user.into())
}

/// Logout. Always succeeds and always clears the cookie.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Ok(Some(token)) = session_token_from_headers(&headers)
        && let Err(e) = state.sessions().revoke(&token).await
    {
        warn!("Failed to revoke session on logout: {}", e);
    }

    (
        AppendHeaders([(SET_COOKIE, state.auth.clear_cookie())]),
        MessageResponse::new("Logged out"),
    )
}

/// Evaluate the guard for the current identity.
///
/// 200 `{allowed: true}` or 403 naming the action.
pub async fn authorize(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, AuthError> {
    state
        .auth
        .guard()
        .require(&user, request.action, &request.scope)?;
    Ok(Json(AuthorizeResponse { allowed: true }))
}

/// Visibility filter the caller's list queries must apply.
pub async fn record_filter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RecordFilterQuery>,
) -> Json<RecordFilter> {
    Json(state.auth.guard().record_filter(&user, query.resource))
}
