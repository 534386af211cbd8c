//! Storage error types shared by the identity and session stores.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (email, token) is already taken.
    #[error("record already exists: {0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl StoreError {
    /// Map an insert failure, turning unique violations into `Conflict`.
    pub fn from_insert(err: sqlx::Error, key: &str) -> Self {
        let unique = err
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation());
        if unique {
            StoreError::Conflict(key.to_string())
        } else {
            StoreError::Unavailable(err)
        }
    }
}
