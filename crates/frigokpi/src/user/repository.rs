//! User repository for database operations.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::db::{StoreError, StoreResult};

use super::models::{IdentityChanges, NewIdentity, User, UserListQuery};
use super::store::IdentityStore;

const USER_COLUMNS: &str = "id, email, display_name, password_hash, picture, role, division, region, created_at, updated_at";

/// SQLite-backed identity directory.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new user ID.
    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    async fn insert_with(&self, identity: &NewIdentity, on_conflict_ignore: bool) -> StoreResult<u64> {
        let id = Self::generate_id();
        debug!("Inserting identity {} ({})", identity.email, id);

        let sql = if on_conflict_ignore {
            r#"
            INSERT INTO users (id, email, display_name, password_hash, picture, role, division, region)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#
        } else {
            r#"
            INSERT INTO users (id, email, display_name, password_hash, picture, role, division, region)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        };

        let result = sqlx::query(sql)
            .bind(&id)
            .bind(&identity.email)
            .bind(&identity.display_name)
            .bind(&identity.password_hash)
            .bind(&identity.picture)
            .bind(identity.role)
            .bind(identity.division)
            .bind(identity.region)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, &identity.email))?;

        Ok(result.rows_affected())
    }

    async fn fetch_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[cfg(test)]
    pub async fn count(&self) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl IdentityStore for UserRepository {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.fetch_by_email(email).await
    }

    #[instrument(skip(self, identity), fields(email = %identity.email))]
    async fn insert(&self, identity: NewIdentity) -> StoreResult<User> {
        self.insert_with(&identity, false).await?;
        self.fetch_by_email(&identity.email)
            .await?
            .ok_or_else(|| StoreError::Unavailable(sqlx::Error::RowNotFound))
    }

    #[instrument(skip(self, identity), fields(email = %identity.email))]
    async fn insert_if_absent(&self, identity: NewIdentity) -> StoreResult<(User, bool)> {
        let inserted = self.insert_with(&identity, true).await? == 1;
        let user = self
            .fetch_by_email(&identity.email)
            .await?
            .ok_or_else(|| StoreError::Unavailable(sqlx::Error::RowNotFound))?;
        Ok((user, inserted))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &str, changes: IdentityChanges) -> StoreResult<Option<User>> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let mut updates = Vec::new();
        let mut values: Vec<Option<String>> = Vec::new();

        if let Some(display_name) = changes.display_name {
            updates.push("display_name = ?");
            values.push(Some(display_name));
        }

        if let Some(password_hash) = changes.password_hash {
            updates.push("password_hash = ?");
            values.push(Some(password_hash));
        }

        if let Some(role) = changes.role {
            updates.push("role = ?");
            values.push(Some(role.to_string()));
        }

        if let Some(division) = changes.division {
            updates.push("division = ?");
            values.push(division.map(|d| d.to_string()));
        }

        if let Some(region) = changes.region {
            updates.push("region = ?");
            values.push(region.map(|r| r.to_string()));
        }

        updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')");

        let sql = format!("UPDATE users SET {} WHERE id = ?", updates.join(", "));

        let mut query_builder = sqlx::query(&sql);
        for value in &values {
            query_builder = query_builder.bind(value);
        }

        let result = query_builder.bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &UserListQuery) -> StoreResult<Vec<User>> {
        let limit = query.limit.unwrap_or(100);
        let offset = query.offset.unwrap_or(0);

        let mut sql = format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1");
        let mut bind_values: Vec<String> = Vec::new();

        if let Some(role) = &query.role {
            sql.push_str(" AND role = ?");
            bind_values.push(role.to_string());
        }

        if let Some(division) = &query.division {
            sql.push_str(" AND division = ?");
            bind_values.push(division.to_string());
        }

        if let Some(region) = &query.region {
            sql.push_str(" AND region = ?");
            bind_values.push(region.to_string());
        }

        if let Some(search) = &query.search {
            sql.push_str(" AND (email LIKE ? OR display_name LIKE ?)");
            let pattern = format!("%{}%", search);
            bind_values.push(pattern.clone());
            bind_values.push(pattern);
        }

        sql.push_str(" ORDER BY created_at DESC, email ASC LIMIT ? OFFSET ?");

        let mut query_builder = sqlx::query_as::<_, User>(&sql);
        for value in &bind_values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(limit).bind(offset);

        Ok(query_builder.fetch_all(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::user::models::{Division, Region, UserRole};

    async fn setup_repo() -> UserRepository {
        let db = Database::in_memory().await.unwrap();
        UserRepository::new(db.pool().clone())
    }

    fn new_identity(email: &str, role: UserRole) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            display_name: email.split('@').next().unwrap().to_string(),
            password_hash: None,
            picture: None,
            role,
            division: None,
            region: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let repo = setup_repo().await;

        let user = repo
            .insert(new_identity("alice@x.com", UserRole::DevCoIdf))
            .await
            .unwrap();
        assert!(user.id.starts_with("usr_"));
        assert_eq!(user.role, UserRole::DevCoIdf);
        assert!(user.division.is_none());

        let fetched = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "alice@x.com");

        let by_email = repo.get_by_email("ALICE@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_insert_duplicate_email_conflicts() {
        let repo = setup_repo().await;
        repo.insert(new_identity("bob@x.com", UserRole::DevCoHdf))
            .await
            .unwrap();

        let err = repo
            .insert(new_identity("Bob@X.com", UserRole::DevCoIdf))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_existing() {
        let repo = setup_repo().await;
        let existing = repo
            .insert(new_identity("carol@x.com", UserRole::DirectriceClientele))
            .await
            .unwrap();

        let mut again = new_identity("carol@x.com", UserRole::DevCoIdf);
        again.display_name = "Someone Else".to_string();
        let (user, created) = repo.insert_if_absent(again).await.unwrap();

        assert!(!created);
        assert_eq!(user.id, existing.id);
        assert_eq!(user.role, UserRole::DirectriceClientele);
        assert_eq!(user.display_name, existing.display_name);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_user_sets_and_clears_scope() {
        let repo = setup_repo().await;
        let user = repo
            .insert(new_identity("dave@x.com", UserRole::AssistanteClientele))
            .await
            .unwrap();

        let updated = repo
            .update(
                &user.id,
                IdentityChanges {
                    display_name: Some("Dave".to_string()),
                    role: Some(UserRole::DevCoHdf),
                    division: Some(Some(Division::FreshFood)),
                    region: Some(Some(Region::Hdf)),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.display_name, "Dave");
        assert_eq!(updated.role, UserRole::DevCoHdf);
        assert_eq!(updated.division, Some(Division::FreshFood));
        assert_eq!(updated.region, Some(Region::Hdf));

        let cleared = repo
            .update(
                &user.id,
                IdentityChanges {
                    region: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.region, None);
        assert_eq!(cleared.division, Some(Division::FreshFood));

        let missing = repo
            .update(
                "usr_missing",
                IdentityChanges {
                    role: Some(UserRole::DevCoIdf),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let repo = setup_repo().await;
        let user = repo
            .insert(new_identity("erin@x.com", UserRole::DevCoIdf))
            .await
            .unwrap();

        assert!(repo.delete(&user.id).await.unwrap());
        assert!(!repo.delete(&user.id).await.unwrap());
        assert!(repo.get(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_users() {
        let repo = setup_repo().await;

        for i in 0..5 {
            let role = if i == 0 {
                UserRole::AdminDirecteur
            } else {
                UserRole::DevCoIdf
            };
            repo.insert(new_identity(&format!("user{}@x.com", i), role))
                .await
                .unwrap();
        }

        let all = repo.list(&UserListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 5);

        let admins = repo
            .list(&UserListQuery {
                role: Some(UserRole::AdminDirecteur),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.len(), 1);

        let search = repo
            .list(&UserListQuery {
                search: Some("user2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);

        let devcos = repo
            .list(&UserListQuery {
                role: Some(UserRole::DevCoIdf),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(devcos.len(), 4);
    }
}
