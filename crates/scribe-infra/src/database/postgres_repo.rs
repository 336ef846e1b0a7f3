//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use scribe_core::domain::{Post, PostPatch, User};
use scribe_core::error::RepoError;
use scribe_core::ports::{BaseRepository, PostRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{LiveScope, PostgresBaseRepository, write_error};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

impl LiveScope for UserEntity {}

impl LiveScope for PostEntity {
    fn live() -> Condition {
        Condition::all().add(post::Column::DeletedAt.is_null())
    }
}

/// Keep only the first character of the local part for logging.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) if local.chars().count() > 1 => format!("{}***@{}", first, domain),
            _ => format!("***@{}", domain),
        },
        None => "***".to_string(),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(PostEntity::live())
            .order_by_desc(post::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn patch(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, RepoError> {
        let stamp: DateTimeWithTimeZone = patch.updated_at.into();
        let mut update = PostEntity::update_many()
            .col_expr(post::Column::UpdatedAt, Expr::value(stamp))
            .filter(post::Column::Id.eq(id))
            .filter(PostEntity::live());

        if let Some(title) = &patch.title {
            update = update.col_expr(post::Column::Title, Expr::value(title.clone()));
        }
        if let Some(body) = &patch.body {
            update = update.col_expr(post::Column::Body, Expr::value(body.clone()));
        }
        if let Some(category_id) = patch.category_id {
            update = update.col_expr(post::Column::CategoryId, Expr::value(category_id));
        }
        if let Some(image) = &patch.image {
            update = update.col_expr(post::Column::Image, Expr::value(image.clone()));
        }
        if let Some(url) = &patch.url {
            update = update.col_expr(post::Column::Url, Expr::value(url.clone()));
        }

        let result = update.exec(&self.db).await.map_err(write_error)?;
        if result.rows_affected == 0 {
            tracing::debug!(post_id = %id, "Patch matched no live post");
            return Ok(None);
        }

        <Self as BaseRepository<Post, Uuid>>::find_by_id(self, id).await
    }

    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<(), RepoError> {
        let stamp: DateTimeWithTimeZone = deleted_at.into();

        let result = PostEntity::update_many()
            .col_expr(post::Column::DeletedAt, Expr::value(stamp))
            .col_expr(post::Column::UpdatedAt, Expr::value(stamp))
            .filter(post::Column::Id.eq(id))
            .filter(PostEntity::live())
            .exec(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        tracing::debug!(post_id = %id, "Post soft-deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::mask_email;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("writer@example.com"), "w***@example.com");
        assert_eq!(mask_email("w@example.com"), "***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }
}
