//! Authentication configuration.

use serde::{Deserialize, Serialize};

use crate::user::UserRole;

/// Default provider endpoint that turns a redirect session id into a profile.
pub const DEFAULT_SESSION_INFO_URL: &str =
    "https://demobackend.emergentagent.com/auth/v1/env/oauth/session-data";

/// How the guard treats reads and writes on division/region-scoped records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadScope {
    /// Any authenticated role may touch scoped records.
    #[default]
    Open,
    /// Non-admin roles are confined to their own division and region.
    DivisionRegion,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Absolute session lifetime in hours.
    pub session_ttl_hours: u64,

    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,

    /// Role given to identities created by an external login.
    pub default_external_role: UserRole,

    /// Allow `POST /api/auth/register`.
    pub allow_self_registration: bool,

    /// Allow self-registration to request `Admin_Directeur`.
    pub allow_admin_self_registration: bool,

    /// Guard behavior for scoped records.
    pub read_scope: ReadScope,

    /// Refuse a second exchange of the same external session id.
    pub replay_protection: bool,

    /// How long an exchanged session id is remembered.
    pub replay_window_secs: u64,

    /// Interval of the expired-session sweep. 0 disables it.
    pub session_sweep_interval_secs: u64,

    /// Allowed CORS origins. If empty, CORS is disabled.
    pub allowed_origins: Vec<String>,

    /// Mark the session cookie `Secure` (and `SameSite=None`).
    pub cookie_secure: bool,

    /// External identity provider.
    pub external: ExternalProviderConfig,

    /// Administrator ensured at startup.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            default_external_role: UserRole::DevCoIdf,
            allow_self_registration: true,
            allow_admin_self_registration: false,
            read_scope: ReadScope::Open,
            replay_protection: true,
            replay_window_secs: 600,
            session_sweep_interval_secs: 300,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
            cookie_secure: true,
            external: ExternalProviderConfig::default(),
            bootstrap_admin: None,
        }
    }
}

impl AuthConfig {
    /// Session lifetime.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours as i64)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.session_ttl_hours == 0 {
            return Err(ConfigValidationError::ZeroSessionTtl);
        }
        // Keep the expiry arithmetic well inside chrono's range.
        if self.session_ttl_hours > 24 * 365 * 10 {
            return Err(ConfigValidationError::SessionTtlTooLong);
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigValidationError::InvalidBcryptCost(self.bcrypt_cost));
        }

        if self.external.enabled {
            match self.external.session_info_url.as_deref() {
                None | Some("") => return Err(ConfigValidationError::MissingSessionInfoUrl),
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    return Err(ConfigValidationError::InvalidSessionInfoUrl(url.to_string()));
                }
                Some(_) => {}
            }
            if self.external.timeout_secs == 0 {
                return Err(ConfigValidationError::ZeroProviderTimeout);
            }
        }

        if let Some(admin) = &self.bootstrap_admin {
            admin.resolve_password()?;
        }

        Ok(())
    }
}

/// External identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalProviderConfig {
    pub enabled: bool,

    /// Session-info endpoint, called with the `X-Session-ID` header.
    pub session_info_url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ExternalProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_info_url: Some(DEFAULT_SESSION_INFO_URL.to_string()),
            timeout_secs: 10,
        }
    }
}

/// Administrator account created at startup if missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub name: String,
    /// Cleartext password, or `env:VAR_NAME`.
    pub password: String,
}

impl BootstrapAdmin {
    /// Resolve the password, expanding `env:VAR_NAME` syntax.
    pub fn resolve_password(&self) -> Result<String, ConfigValidationError> {
        let resolved = match self.password.strip_prefix("env:") {
            Some(var_name) => match std::env::var(var_name) {
                Ok(secret) if !secret.is_empty() => secret,
                Ok(_) => return Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                Err(_) => return Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
            },
            None => self.password.clone(),
        };

        if resolved.is_empty() {
            return Err(ConfigValidationError::EmptyBootstrapPassword);
        }
        Ok(resolved)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Session TTL must be positive.
    ZeroSessionTtl,
    /// Session TTL beyond ten years.
    SessionTtlTooLong,
    /// bcrypt cost outside 4..=31.
    InvalidBcryptCost(u32),
    /// External login enabled without an endpoint.
    MissingSessionInfoUrl,
    /// Endpoint is not an http(s) URL.
    InvalidSessionInfoUrl(String),
    /// Provider timeout must be positive.
    ZeroProviderTimeout,
    /// Bootstrap admin without a password.
    EmptyBootstrapPassword,
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    EnvVarEmpty(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroSessionTtl => write!(f, "auth.session_ttl_hours must be greater than 0."),
            Self::SessionTtlTooLong => {
                write!(f, "auth.session_ttl_hours must not exceed ten years.")
            }
            Self::InvalidBcryptCost(cost) => {
                write!(f, "auth.bcrypt_cost must be between 4 and 31 (got {}).", cost)
            }
            Self::MissingSessionInfoUrl => write!(
                f,
                "auth.external.session_info_url is required when external login is enabled."
            ),
            Self::InvalidSessionInfoUrl(url) => write!(
                f,
                "auth.external.session_info_url must be an http(s) URL (got '{}').",
                url
            ),
            Self::ZeroProviderTimeout => {
                write!(f, "auth.external.timeout_secs must be greater than 0.")
            }
            Self::EmptyBootstrapPassword => {
                write!(f, "auth.bootstrap_admin.password must not be empty.")
            }
            Self::EnvVarNotFound(var) => write!(
                f,
                "Environment variable '{}' not found (referenced via env:{} in config).",
                var, var
            ),
            Self::EnvVarEmpty(var) => write!(
                f,
                "Environment variable '{}' is empty (referenced via env:{} in config).",
                var, var
            ),
        }
    }
}

impl std::error::Error for ConfigValidationError {}
