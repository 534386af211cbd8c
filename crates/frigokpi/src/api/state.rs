//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    AuthConfig, AuthState, Authenticator, CredentialVerifier, ExternalExchanger, ReplayGuard,
    SessionInfoProvider,
};
use crate::db::Database;
use crate::session::{Clock, SessionRepository, SessionService};
use crate::user::{UserRepository, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Identity directory operations.
    pub users: Arc<UserService>,
    /// Session resolution, guard and auth config.
    pub auth: AuthState,
    /// Credential paths and session issuance.
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    /// Create new application state.
    pub fn new(users: UserService, auth: AuthState, authenticator: Authenticator) -> Self {
        Self {
            users: Arc::new(users),
            auth,
            authenticator: Arc::new(authenticator),
        }
    }

    /// Wire every service against one database.
    ///
    /// `provider` is `None` when external login is disabled.
    pub fn assemble(
        db: &Database,
        config: AuthConfig,
        provider: Option<Arc<dyn SessionInfoProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let identities = Arc::new(UserRepository::new(db.pool().clone()));
        let session_store = Arc::new(SessionRepository::new(db.pool().clone()));

        let sessions = SessionService::new(
            session_store,
            identities.clone(),
            clock,
            config.session_ttl(),
        );

        let replay = config
            .replay_protection
            .then(|| Arc::new(ReplayGuard::new(Duration::from_secs(config.replay_window_secs))));

        let verifier = CredentialVerifier::new(identities.clone(), config.bcrypt_cost);
        let exchanger = ExternalExchanger::new(
            provider,
            identities.clone(),
            replay,
            config.default_external_role,
        );
        let authenticator = Authenticator::new(verifier, exchanger, sessions.clone());
        let users = UserService::new(identities, config.bcrypt_cost);
        let auth = AuthState::new(config, sessions);

        Self::new(users, auth, authenticator)
    }

    pub fn sessions(&self) -> &SessionService {
        self.auth.sessions()
    }
}
