use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Entity;
use crate::filter::{Page, PageRequest, Specification};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found<T: Entity>(external_id: Uuid) -> Self {
        StoreError::NotFound(format!("{} {} not found", T::LABEL, external_id))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // 23505 unique_violation, 23503 foreign_key_violation
            match db.code().as_deref() {
                Some("23505") => {
                    return StoreError::Conflict(format!(
                        "duplicate value violates {}",
                        db.constraint().unwrap_or("a unique constraint")
                    ))
                }
                Some("23503") => {
                    return StoreError::Conflict("You cannot delete this item while it is in use".to_string())
                }
                _ => {}
            }
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return StoreError::NotFound("Record not found".to_string());
        }
        StoreError::Unexpected(err.into())
    }
}

/// Generic persistence contract shared by every graph node type
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn find(&self, external_id: Uuid) -> StoreResult<T>;

    /// Page of rows matching `spec`, ordered by id
    async fn find_all(&self, spec: &Specification, page: PageRequest) -> StoreResult<Page<T>>;

    /// Assigns the storage id; `record.id` is ignored
    async fn insert(&self, record: T) -> StoreResult<T>;

    /// Overwrites the row with `record.id`
    async fn update(&self, record: T) -> StoreResult<T>;

    /// Removes owned edges with the row; refuses while other rows reference it
    async fn delete(&self, external_id: Uuid) -> StoreResult<()>;
}
