//! Identity directory storage abstraction.

use async_trait::async_trait;

use crate::db::StoreResult;

use super::models::{IdentityChanges, NewIdentity, User, UserListQuery};

/// Keyed access to identity records.
///
/// Emails passed in are expected to be normalized already (see
/// [`normalize_email`](super::normalize_email)); implementations must still
/// treat them case-insensitively.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an identity by id.
    async fn get(&self, id: &str) -> StoreResult<Option<User>>;

    /// Look up an identity by email.
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Insert a new identity. Fails with `Conflict` if the email is taken.
    async fn insert(&self, identity: NewIdentity) -> StoreResult<User>;

    /// Insert unless an identity with the same email exists, atomically.
    ///
    /// Returns the stored identity and whether it was created by this call.
    /// An existing record is returned unchanged.
    async fn insert_if_absent(&self, identity: NewIdentity) -> StoreResult<(User, bool)>;

    /// Apply changes. Returns `None` if the identity does not exist.
    async fn update(&self, id: &str, changes: IdentityChanges) -> StoreResult<Option<User>>;

    /// Delete an identity. Returns whether a record was removed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// List identities matching the query.
    async fn list(&self, query: &UserListQuery) -> StoreResult<Vec<User>>;
}
