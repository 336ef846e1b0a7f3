use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Post, PostPatch, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Physically delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
}

/// Post repository.
///
/// `find_by_id` and `find_by_author` never return soft-deleted posts.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// All live posts written by `author_id`, newest first.
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError>;

    /// Write only the patched columns of a live post and return the stored result.
    ///
    /// Returns `None` when the post is missing or already trashed.
    async fn patch(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, RepoError>;

    /// Mark a post deleted without removing the row.
    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<(), RepoError>;
}
