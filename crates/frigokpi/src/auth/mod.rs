//! Authentication and authorization.
//!
//! Two credential paths (password and external provider handoff) converge on
//! one session issuer. Requests then carry the session token, resolved by the
//! middleware, and the guard decides what the resolved identity may do.

mod authenticator;
mod config;
mod error;
mod external;
mod guard;
mod middleware;
mod password;

pub use authenticator::{Authenticator, Credential};
pub use config::{
    AuthConfig, BootstrapAdmin, ConfigValidationError, DEFAULT_SESSION_INFO_URL,
    ExternalProviderConfig, ReadScope,
};
pub use error::{AuthError, AuthResult, ExchangeFailure};
pub use external::{
    ExternalExchanger, ExternalProfile, HttpSessionInfoProvider, ProviderError, ReplayGuard,
    SESSION_ID_HEADER, SessionInfoProvider,
};
pub use guard::{
    Action, AuthorizationGuard, Decision, DenyReason, RecordFilter, ResourceKind, Scope,
};
pub use middleware::{
    AuthState, CurrentUser, RequireAdmin, SESSION_COOKIE, auth_middleware, clear_session_cookie,
    session_cookie, session_token_from_headers,
};
pub use password::{CredentialVerifier, hash_password, verify_password};
