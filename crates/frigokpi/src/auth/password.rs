//! Password hashing and the credential verifier.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::error::{AuthError, AuthResult};
use crate::user::{IdentityStore, User, normalize_email};

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AuthError::Internal(format!("failed to hash password: {e}")))
}

/// Verify a password against a bcrypt hash on the blocking pool.
///
/// A malformed hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))
}

/// Checks email/password pairs against the identity directory.
#[derive(Clone)]
pub struct CredentialVerifier {
    identities: Arc<dyn IdentityStore>,
    /// Compared against when there is no stored hash, so unknown emails cost
    /// the same bcrypt work as known ones.
    dummy_hash: Option<String>,
}

impl CredentialVerifier {
    pub fn new(identities: Arc<dyn IdentityStore>, bcrypt_cost: u32) -> Self {
        let dummy_hash = bcrypt::hash("frigokpi-dummy-credential", bcrypt_cost).ok();
        Self {
            identities,
            dummy_hash,
        }
    }

    /// Verify a password credential.
    ///
    /// Unknown email, identity without a password, and wrong password all
    /// yield `InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn verify(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = normalize_email(email);
        let user = self
            .identities
            .get_by_email(&email)
            .await?
            .filter(User::has_password);

        let hash = match user.as_ref().and_then(|u| u.password_hash.as_deref()) {
            Some(hash) => hash,
            None => match self.dummy_hash.as_deref() {
                Some(dummy) => dummy,
                None => return Err(AuthError::InvalidCredentials),
            },
        };

        let matches = verify_password(password, hash).await?;

        match user {
            Some(user) if matches => Ok(user),
            _ => {
                debug!("Password verification failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}
