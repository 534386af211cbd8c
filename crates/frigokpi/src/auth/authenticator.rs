//! Credential paths converging on session issuance.

use std::fmt;

use tracing::{info, instrument};

use super::error::AuthResult;
use super::external::ExternalExchanger;
use super::password::CredentialVerifier;
use crate::session::{CredentialMethod, IssuedSession, SessionService};
use crate::user::User;

/// A credential presented at login.
#[derive(Clone)]
pub enum Credential {
    Password { email: String, password: String },
    ExternalProvider { session_id: String },
}

impl Credential {
    pub fn method(&self) -> CredentialMethod {
        match self {
            Credential::Password { .. } => CredentialMethod::Password,
            Credential::ExternalProvider { .. } => CredentialMethod::External,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            Credential::ExternalProvider { .. } => {
                f.debug_struct("ExternalProvider").finish_non_exhaustive()
            }
        }
    }
}

/// Verifies a credential and mints a session for the resulting identity.
#[derive(Clone)]
pub struct Authenticator {
    verifier: CredentialVerifier,
    exchanger: ExternalExchanger,
    sessions: SessionService,
}

impl Authenticator {
    pub fn new(
        verifier: CredentialVerifier,
        exchanger: ExternalExchanger,
        sessions: SessionService,
    ) -> Self {
        Self {
            verifier,
            exchanger,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    pub fn exchanger(&self) -> &ExternalExchanger {
        &self.exchanger
    }

    /// Authenticate and issue a session.
    ///
    /// No session exists unless the credential check fully succeeded.
    #[instrument(skip_all, fields(method = %credential.method()))]
    pub async fn authenticate(&self, credential: Credential) -> AuthResult<(User, IssuedSession)> {
        let method = credential.method();
        let user = match credential {
            Credential::Password { email, password } => {
                self.verifier.verify(&email, &password).await?
            }
            Credential::ExternalProvider { session_id } => {
                self.exchanger.exchange(&session_id).await?
            }
        };

        let session = self.sessions.issue(&user, method).await?;
        info!(user_id = %user.id, "User authenticated");
        Ok((user, session))
    }

    /// Issue a session for an identity that was just created by registration.
    pub async fn start_session(&self, user: &User) -> AuthResult<IssuedSession> {
        self.sessions.issue(user, CredentialMethod::Password).await
    }
}
