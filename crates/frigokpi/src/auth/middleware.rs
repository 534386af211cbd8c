//! Authentication middleware.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use log::debug;

use super::guard::AuthorizationGuard;
use super::{AuthConfig, AuthError};
use crate::session::SessionService;
use crate::user::User;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "session_token";

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::Unauthenticated)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Unauthenticated);
    }

    let token = parts.next().ok_or(AuthError::Unauthenticated)?;
    if parts.next().is_some() {
        return Err(AuthError::Unauthenticated);
    }

    Ok(token)
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim()).filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}

/// Session token presented with a request.
///
/// The Authorization header wins over the cookie. A malformed header is an
/// error rather than a fallback to the cookie.
pub fn session_token_from_headers(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    if let Some(header) = headers.get(AUTHORIZATION) {
        let value = header.to_str().map_err(|_| AuthError::Unauthenticated)?;
        return bearer_token_from_header(value).map(|t| Some(t.to_string()));
    }

    Ok(headers
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_header| token_from_cookie_header(cookie_header, SESSION_COOKIE))
        .map(str::to_string))
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    // Cross-site frontends need SameSite=None, which browsers only honor with Secure.
    let attrs = if secure {
        "SameSite=None; Secure"
    } else {
        "SameSite=Lax"
    };
    format!(
        "{}={}; Path=/; HttpOnly; {}; Max-Age={}",
        SESSION_COOKIE, token, attrs, max_age_secs
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    sessions: SessionService,
    guard: AuthorizationGuard,
}

impl AuthState {
    pub fn new(config: AuthConfig, sessions: SessionService) -> Self {
        let guard = AuthorizationGuard::new(config.read_scope);
        Self {
            config: Arc::new(config),
            sessions,
            guard,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Cookie for a freshly issued session.
    pub fn session_cookie(&self, token: &str) -> String {
        session_cookie(
            token,
            self.sessions.ttl().num_seconds(),
            self.config.cookie_secure,
        )
    }

    pub fn clear_cookie(&self) -> String {
        clear_session_cookie(self.config.cookie_secure)
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn user(&self) -> &User {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Authentication middleware.
///
/// Resolves the session token and injects `CurrentUser` into request
/// extensions. Token sources, in priority order:
/// 1. Authorization: Bearer <token> header
/// 2. session_token cookie
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = session_token_from_headers(req.headers())?.ok_or_else(|| {
        debug!("Request without session token");
        AuthError::Unauthenticated
    })?;

    let user = auth.sessions.resolve(&token).await?;
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Require the identity administration right.
///
/// Use as an extractor in handlers that require admin access.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        // `administer` does not depend on the read scope.
        AuthorizationGuard::default().require_admin(&user.0)?;
        Ok(RequireAdmin(user))
    }
}
