//! User service for identity directory business logic.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::models::{
    CreateUserRequest, IdentityChanges, NewIdentity, UpdateUserRequest, User, UserListQuery,
    UserRole,
};
use super::store::IdentityStore;
use crate::auth::{AuthError, AuthResult, hash_password};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email validation.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Service for identity management operations.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn IdentityStore>,
    bcrypt_cost: u32,
}

impl UserService {
    /// Create a new user service.
    pub fn new(store: Arc<dyn IdentityStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    /// Create a new identity with validation.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, request: CreateUserRequest) -> AuthResult<User> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidInput("invalid email format".to_string()));
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("name must not be empty".to_string()));
        }

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(self.hash_checked(password).await?),
            None => None,
        };

        let user = self
            .store
            .insert(NewIdentity {
                email,
                display_name: name.to_string(),
                password_hash,
                picture: None,
                role: request.role,
                division: request.division,
                region: request.region,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "Created new user");
        Ok(user)
    }

    /// Get an identity by email.
    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.store.get_by_email(&normalize_email(email)).await?)
    }

    /// List identities with optional filters.
    #[instrument(skip(self))]
    pub async fn list_users(&self, query: UserListQuery) -> AuthResult<Vec<User>> {
        Ok(self.store.list(&query).await?)
    }

    /// Update an identity (name, password, role, division, region).
    #[instrument(skip(self, request))]
    pub async fn update_user(&self, id: &str, request: UpdateUserRequest) -> AuthResult<User> {
        let display_name = match request.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AuthError::InvalidInput("name must not be empty".to_string()));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(self.hash_checked(password).await?),
            None => None,
        };

        let changes = IdentityChanges {
            display_name,
            password_hash,
            role: request.role,
            division: request.division,
            region: request.region,
        };

        let user = self
            .store
            .update(id, changes)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(user_id = %user.id, role = %user.role, "Updated user");
        Ok(user)
    }

    /// Delete an identity. Sessions are revoked by the caller.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> AuthResult<()> {
        if !self.store.delete(id).await? {
            return Err(AuthError::UserNotFound);
        }
        warn!(user_id = %id, "Deleted user");
        Ok(())
    }

    /// Make sure an administrator with this email exists.
    ///
    /// An existing identity is left untouched, whatever its role.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, name: &str, password: &str) -> AuthResult<User> {
        if let Some(existing) = self.get_user_by_email(email).await? {
            if existing.role != UserRole::AdminDirecteur {
                warn!(
                    user_id = %existing.id,
                    role = %existing.role,
                    "Bootstrap admin email belongs to a non-admin identity"
                );
            }
            return Ok(existing);
        }

        self.create_user(CreateUserRequest {
            email: email.to_string(),
            name: name.to_string(),
            password: Some(password.to_string()),
            role: UserRole::AdminDirecteur,
            division: None,
            region: None,
        })
        .await
    }

    async fn hash_checked(&self, password: &str) -> AuthResult<String> {
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }
        hash_password(password, self.bcrypt_cost).await
    }
}
