//! Session storage abstraction.

use async_trait::async_trait;

use crate::db::StoreResult;

use super::models::Session;

/// Keyed access to session records.
///
/// Records are keyed by the token digest; the store never sees raw tokens.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session. Fails with `Conflict` if the key is taken.
    async fn insert(&self, session: &Session) -> StoreResult<()>;

    /// Look up a session by token digest.
    async fn get(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    /// Delete a session. Returns whether a record was removed.
    async fn delete(&self, token_hash: &str) -> StoreResult<bool>;

    /// Delete every session bound to an identity.
    async fn delete_for_user(&self, user_id: &str) -> StoreResult<u64>;

    /// Delete sessions whose expiry is at or before `now_ms`.
    async fn delete_expired(&self, now_ms: i64) -> StoreResult<u64>;
}
