//! External identity exchange.
//!
//! The browser comes back from the provider's OAuth redirect with a one-time
//! session id. We trade it for a verified profile with a single call to the
//! provider's session-info endpoint, then upsert the identity by email. The
//! provider's own tokens never leave this module.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::config::ExternalProviderConfig;
use super::error::{AuthError, AuthResult, ExchangeFailure};
use crate::session::hash_token;
use crate::user::{IdentityStore, NewIdentity, User, UserRole, is_valid_email, normalize_email};

/// Header carrying the session id on the provider call.
pub const SESSION_ID_HEADER: &str = "X-Session-ID";

/// Verified profile returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Errors from the provider client.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered 4xx for this session id.
    #[error("provider rejected session (status {0})")]
    Rejected(u16),

    /// Network failure, timeout, or provider-side 5xx.
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// Response body was not a usable profile.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn failure(&self) -> ExchangeFailure {
        match self {
            ProviderError::Rejected(_) => ExchangeFailure::Rejected,
            ProviderError::Unreachable(_) => ExchangeFailure::Unreachable,
            ProviderError::Malformed(_) => ExchangeFailure::Malformed,
        }
    }
}

/// Looks up the profile behind an external session id.
#[async_trait]
pub trait SessionInfoProvider: Send + Sync {
    async fn fetch_profile(&self, session_id: &str) -> Result<ExternalProfile, ProviderError>;
}

/// Provider payload. Extra fields (including the provider's own
/// `session_token`) are ignored.
#[derive(Debug, Deserialize)]
struct SessionInfoResponse {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Session-info lookup over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpSessionInfoProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpSessionInfoProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unreachable(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Build from config. Returns `None` when external login is disabled.
    pub fn from_config(config: &ExternalProviderConfig) -> Result<Option<Self>, ProviderError> {
        if !config.enabled {
            return Ok(None);
        }
        let url = config
            .session_info_url
            .clone()
            .ok_or_else(|| ProviderError::Malformed("no session_info_url configured".into()))?;
        Self::new(url, Duration::from_secs(config.timeout_secs)).map(Some)
    }
}

#[async_trait]
impl SessionInfoProvider for HttpSessionInfoProvider {
    async fn fetch_profile(&self, session_id: &str) -> Result<ExternalProfile, ProviderError> {
        let response = self
            .client
            .get(&self.url)
            .header(SESSION_ID_HEADER, session_id)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(ProviderError::Rejected(status.as_u16()));
        }
        if status.is_server_error() {
            return Err(ProviderError::Unreachable(format!("status {}", status)));
        }
        if !status.is_success() {
            return Err(ProviderError::Malformed(format!("unexpected status {}", status)));
        }

        let body: SessionInfoResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let email = body
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("missing email".to_string()))?;

        Ok(ExternalProfile {
            email,
            name: body.name.unwrap_or_default(),
            picture: body.picture.filter(|p| !p.is_empty()),
        })
    }
}

/// Claims between two inline evictions of stale entries.
const EVICT_EVERY: usize = 64;

/// Remembers exchanged session ids for a bounded window.
///
/// Keys are digests, so raw ids are not kept in memory. Stale claims are
/// evicted on the claim path every [`EVICT_EVERY`] claims, so the map stays
/// bounded even when no background sweep runs.
#[derive(Debug)]
pub struct ReplayGuard {
    seen: DashMap<String, Instant>,
    window: Duration,
    claims: AtomicUsize,
}

impl ReplayGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            window,
            claims: AtomicUsize::new(0),
        }
    }

    /// Claim a session id. Returns false if it was claimed within the window.
    pub fn claim(&self, session_id: &str) -> bool {
        self.claim_at(session_id, Instant::now())
    }

    fn claim_at(&self, session_id: &str, now: Instant) -> bool {
        // Evict before taking the entry lock; retain locks every shard.
        if self.claims.fetch_add(1, Ordering::Relaxed) % EVICT_EVERY == EVICT_EVERY - 1 {
            self.sweep_at(now);
        }

        match self.seen.entry(hash_token(session_id)) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) >= self.window {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Forget a claim so the id can be exchanged again.
    pub fn release(&self, session_id: &str) {
        self.seen.remove(&hash_token(session_id));
    }

    /// Drop claims older than the window.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.seen.len();
        self.seen
            .retain(|_, claimed| now.saturating_duration_since(*claimed) < self.window);
        before.saturating_sub(self.seen.len())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Converts an external session id into a local identity.
#[derive(Clone)]
pub struct ExternalExchanger {
    provider: Option<Arc<dyn SessionInfoProvider>>,
    identities: Arc<dyn IdentityStore>,
    replay: Option<Arc<ReplayGuard>>,
    default_role: UserRole,
}

impl ExternalExchanger {
    pub fn new(
        provider: Option<Arc<dyn SessionInfoProvider>>,
        identities: Arc<dyn IdentityStore>,
        replay: Option<Arc<ReplayGuard>>,
        default_role: UserRole,
    ) -> Self {
        Self {
            provider,
            identities,
            replay,
            default_role,
        }
    }

    /// Replay guard, if enabled.
    pub fn replay_guard(&self) -> Option<Arc<ReplayGuard>> {
        self.replay.clone()
    }

    /// Exchange a one-time session id for an identity.
    ///
    /// Creates the identity with the default role if its email is unknown.
    /// An existing identity is returned as stored; its role is never touched.
    #[instrument(skip_all)]
    pub async fn exchange(&self, session_id: &str) -> AuthResult<User> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(AuthError::ExternalExchangeFailed(ExchangeFailure::Disabled))?;

        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(AuthError::ExternalExchangeFailed(ExchangeFailure::Rejected));
        }

        if let Some(replay) = &self.replay
            && !replay.claim(session_id)
        {
            warn!("External session id presented twice");
            return Err(AuthError::ExternalExchangeFailed(ExchangeFailure::Replayed));
        }

        let profile = match provider.fetch_profile(session_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("External exchange failed: {}", e);
                if let (ProviderError::Unreachable(_), Some(replay)) = (&e, &self.replay) {
                    replay.release(session_id);
                }
                return Err(AuthError::ExternalExchangeFailed(e.failure()));
            }
        };

        let email = normalize_email(&profile.email);
        if !is_valid_email(&email) {
            warn!("Provider returned an invalid email address");
            return Err(AuthError::ExternalExchangeFailed(ExchangeFailure::Malformed));
        }

        let display_name = match profile.name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };

        let (user, created) = self
            .identities
            .insert_if_absent(NewIdentity {
                email,
                display_name,
                password_hash: None,
                picture: profile.picture,
                role: self.default_role,
                division: None,
                region: None,
            })
            .await?;

        if created {
            info!(user_id = %user.id, role = %user.role, "Created identity from external login");
        } else {
            info!(user_id = %user.id, "External login for existing identity");
        }

        Ok(user)
    }
}
