//! Session issuer and validator.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use super::clock::Clock;
use super::models::{CredentialMethod, IssuedSession, Session};
use super::store::SessionStore;
use crate::auth::{AuthError, AuthResult};
use crate::db::StoreError;
use crate::user::{IdentityStore, User};

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Attempts before giving up on a token key collision.
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// Generate a fresh opaque bearer token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest under which a token is stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Mints and resolves bearer sessions.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    identities: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        identities: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            identities,
            clock,
            ttl,
        }
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a session for an identity.
    ///
    /// The token is resolvable as soon as this returns.
    #[instrument(skip(self, user), fields(user_id = %user.id, method = %method))]
    pub async fn issue(&self, user: &User, method: CredentialMethod) -> AuthResult<IssuedSession> {
        let now = self.clock.now();
        let expires_at = now + self.ttl;

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let token = generate_token();
            let session = Session {
                token_hash: hash_token(&token),
                user_id: user.id.clone(),
                method,
                created_at: now.timestamp_millis(),
                expires_at: expires_at.timestamp_millis(),
            };

            match self.store.insert(&session).await {
                Ok(()) => {
                    info!(expires_at = %expires_at, "Issued session");
                    return Ok(IssuedSession {
                        token,
                        user_id: user.id.clone(),
                        method,
                        expires_at,
                    });
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(attempt, "Session token collision, regenerating");
                }
                Err(StoreError::Unavailable(e)) => {
                    return Err(AuthError::StorageUnavailable(e.to_string()));
                }
            }
        }

        Err(AuthError::Internal(
            "could not allocate a unique session token".to_string(),
        ))
    }

    /// Resolve a bearer token to its identity.
    ///
    /// Unknown, expired, and orphaned tokens all fail with `Unauthenticated`.
    /// Expired and orphaned records are deleted on the way out.
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> AuthResult<User> {
        if token.is_empty() {
            return Err(AuthError::Unauthenticated);
        }

        let token_hash = hash_token(token);
        let session = self
            .store
            .get(&token_hash)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if session.is_expired_at(self.clock.now()) {
            debug!(user_id = %session.user_id, "Session expired");
            self.discard(&token_hash).await;
            return Err(AuthError::Unauthenticated);
        }

        match self.identities.get(&session.user_id).await? {
            Some(user) => Ok(user),
            None => {
                debug!(user_id = %session.user_id, "Session bound to a deleted identity");
                self.discard(&token_hash).await;
                Err(AuthError::Unauthenticated)
            }
        }
    }

    /// Destroy the session behind a token. Unknown tokens are ignored.
    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        if token.is_empty() {
            return Ok(());
        }
        if self.store.delete(&hash_token(token)).await? {
            debug!("Session revoked");
        }
        Ok(())
    }

    /// Destroy every session of an identity.
    #[instrument(skip(self))]
    pub async fn revoke_all_for_user(&self, user_id: &str) -> AuthResult<u64> {
        let removed = self.store.delete_for_user(user_id).await?;
        if removed > 0 {
            info!(removed, "Revoked sessions for user");
        }
        Ok(removed)
    }

    /// Delete expired sessions.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let removed = self
            .store
            .delete_expired(self.clock.now().timestamp_millis())
            .await?;
        if removed > 0 {
            info!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }

    async fn discard(&self, token_hash: &str) {
        if let Err(e) = self.store.delete(token_hash).await {
            warn!("Failed to delete stale session: {}", e);
        }
    }
}
