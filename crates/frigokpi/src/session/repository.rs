//! Session database repository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::db::{StoreError, StoreResult};

use super::models::Session;
use super::store::SessionStore;

/// SQLite-backed session store.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn insert(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (token_hash, user_id, method, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.token_hash)
        .bind(&session.user_id)
        .bind(session.method)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, "session token"))?;

        Ok(())
    }

    #[instrument(skip_all)]
    async fn get(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token_hash, user_id, method, created_at, expires_at
            FROM user_sessions
            WHERE token_hash = ?
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    #[instrument(skip_all)]
    async fn delete(&self, token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_for_user(&self, user_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self, now_ms: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= ?")
            .bind(now_ms)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
