//! Session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::sqlite_text_enum;

/// Credential path that established a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMethod {
    Password,
    External,
}

impl std::fmt::Display for CredentialMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialMethod::Password => write!(f, "password"),
            CredentialMethod::External => write!(f, "external"),
        }
    }
}

impl std::str::FromStr for CredentialMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(CredentialMethod::Password),
            "external" => Ok(CredentialMethod::External),
            _ => Err(format!("unknown credential method: {}", s)),
        }
    }
}

sqlite_text_enum!(CredentialMethod);

/// Stored session record. Timestamps are unix milliseconds.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: String,
    pub method: CredentialMethod,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Session {
    /// Expiry is absolute: a session is dead from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at
    }
}

/// A freshly minted session, as handed back to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Opaque bearer token. Never stored.
    pub token: String,
    pub user_id: String,
    pub method: CredentialMethod,
    pub expires_at: DateTime<Utc>,
}
