//! Post use-case service.
//!
//! Every write runs the record lifecycle explicitly before touching storage:
//! validate, then authorize (updates and deletes only), then persist.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Actor, Post, User};
use crate::error::DomainError;
use crate::model::lifecycle::{self, Operation};
use crate::model::{Attributes, Model, Record};
use crate::ports::{PostRepository, UserRepository};

/// Guarded CRUD over posts.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { posts, users }
    }

    /// Load a live post.
    pub async fn find(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: Post::ENTITY,
                id,
            })
    }

    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, DomainError> {
        Ok(self.posts.find_by_author(author_id).await?)
    }

    /// Resolve the user a post belongs to.
    pub async fn author(&self, post: &Post) -> Result<User, DomainError> {
        self.users
            .find_by_id(post.author_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "user",
                id: post.author_id,
            })
    }

    /// Create a post authored by `actor`.
    ///
    /// The payload is validated against the create rule set. No ownership check
    /// applies to creation.
    pub async fn create(&self, actor: &Actor, payload: &Attributes) -> Result<Post, DomainError> {
        let author_id = actor.id.ok_or(DomainError::Unauthenticated)?;

        let mut record = Record::new(Post::draft(author_id));
        record.fill(payload);
        lifecycle::guard(Operation::Create, &record, actor)?;
        record.apply_changes()?;

        let post = self.posts.insert(record.model().clone()).await?;
        tracing::info!(post_id = %post.id, author_id = %author_id, "Post created");
        Ok(post)
    }

    /// Apply a partial update. Only attributes that differ from the stored post are
    /// validated and written.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: &Attributes,
    ) -> Result<Post, DomainError> {
        let mut record = Record::loaded(self.find(id).await?);
        record.fill(payload);

        if !record.is_dirty() {
            tracing::debug!(post_id = %id, "Update carried no changes; nothing written");
            return Ok(record.into_model());
        }

        lifecycle::guard(Operation::Update, &record, actor)?;
        let changed: Vec<String> = record.dirty().keys().cloned().collect();
        record.apply_changes()?;
        record.model_mut().touch();

        let patch = record.model().patch(changed.iter().map(String::as_str));
        let post = self
            .posts
            .patch(id, &patch)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: Post::ENTITY,
                id,
            })?;
        record.mark_persisted();
        tracing::info!(post_id = %id, actor_id = ?actor.id, "Post updated");
        Ok(post)
    }

    /// Soft-delete a post.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), DomainError> {
        let record = Record::loaded(self.find(id).await?);
        lifecycle::guard(Operation::Delete, &record, actor)?;

        self.posts.soft_delete(id, Utc::now()).await?;
        tracing::info!(post_id = %id, actor_id = ?actor.id, "Post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};

    use super::*;
    use crate::error::RepoError;
    use crate::domain::PostPatch;
    use crate::model::lifecycle::ADMINISTRATOR_ROLE;
    use crate::ports::BaseRepository;

    #[derive(Default)]
    struct FakePosts {
        rows: Mutex<HashMap<Uuid, Post>>,
        writes: Mutex<usize>,
        patches: Mutex<Vec<PostPatch>>,
    }

    impl FakePosts {
        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        fn last_patch(&self) -> Option<PostPatch> {
            self.patches.lock().unwrap().last().cloned()
        }

        fn raw(&self, id: Uuid) -> Option<Post> {
            self.rows.lock().unwrap().get(&id).cloned()
        }

        fn record_write(&self) {
            *self.writes.lock().unwrap() += 1;
        }
    }

    #[async_trait]
    impl BaseRepository<Post, Uuid> for FakePosts {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
            Ok(self.raw(id).filter(|p| !p.is_trashed()))
        }

        async fn insert(&self, post: Post) -> Result<Post, RepoError> {
            self.record_write();
            self.rows.lock().unwrap().insert(post.id, post.clone());
            Ok(post)
        }

        async fn update(&self, post: Post) -> Result<Post, RepoError> {
            self.record_write();
            self.rows.lock().unwrap().insert(post.id, post.clone());
            Ok(post)
        }

        async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
            self.rows.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepository for FakePosts {
        async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.author_id == author_id && !p.is_trashed())
                .cloned()
                .collect())
        }

        async fn patch(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, RepoError> {
            self.record_write();
            self.patches.lock().unwrap().push(patch.clone());
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.get_mut(&id).filter(|p| !p.is_trashed()).map(|post| {
                patch.apply_to(post);
                post.clone()
            }))
        }

        async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
            self.record_write();
            match self.rows.lock().unwrap().get_mut(&id) {
                Some(post) => {
                    post.deleted_at = Some(at);
                    Ok(())
                }
                None => Err(RepoError::NotFound),
            }
        }
    }

    #[derive(Default)]
    struct FakeUsers {
        rows: Mutex<HashMap<Uuid, User>>,
    }

    #[async_trait]
    impl BaseRepository<User, Uuid> for FakeUsers {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn insert(&self, user: User) -> Result<User, RepoError> {
            self.rows.lock().unwrap().insert(user.id, user.clone());
            Ok(user)
        }

        async fn update(&self, user: User) -> Result<User, RepoError> {
            self.insert(user).await
        }

        async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
            self.rows.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepository for FakeUsers {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }
    }

    fn payload(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn setup() -> (PostService, Arc<FakePosts>, Arc<FakeUsers>) {
        let posts = Arc::new(FakePosts::default());
        let users = Arc::new(FakeUsers::default());
        (PostService::new(posts.clone(), users.clone()), posts, users)
    }

    fn sample() -> Attributes {
        payload(json!({
            "title": "Hello Sample",
            "body": "A valid body of sufficient length.",
            "category_id": 1
        }))
    }

    #[tokio::test]
    async fn test_create_assigns_author_and_persists() {
        let (service, posts, _) = setup();
        let actor = Actor::user(Uuid::new_v4(), vec![]);

        let post = service.create(&actor, &sample()).await.unwrap();

        assert_eq!(Some(post.author_id), actor.id);
        assert_eq!(post.title, "Hello Sample");
        assert_eq!(post.category_id, 1);
        assert_eq!(posts.writes(), 1);
    }

    #[tokio::test]
    async fn test_create_ignores_non_fillable_keys() {
        let (service, _, _) = setup();
        let actor = Actor::user(Uuid::new_v4(), vec![]);
        let mut data = sample();
        data.insert("author_id".to_string(), json!(Uuid::new_v4()));

        let post = service.create(&actor, &data).await.unwrap();
        assert_eq!(Some(post.author_id), actor.id);
    }

    #[tokio::test]
    async fn test_invalid_create_writes_nothing() {
        let (service, posts, _) = setup();
        let actor = Actor::user(Uuid::new_v4(), vec![]);
        let mut data = sample();
        data.insert("title".to_string(), json!("ab"));

        let err = service.create(&actor, &data).await.unwrap_err();
        assert_eq!(err.to_string(), "The title must be at least 3 characters.");
        assert_eq!(posts.writes(), 0);
    }

    #[tokio::test]
    async fn test_guest_cannot_author_posts() {
        let (service, _, _) = setup();
        let err = service.create(&Actor::guest(), &sample()).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_owner_updates_only_changed_fields() {
        let (service, posts, _) = setup();
        let author = Actor::user(Uuid::new_v4(), vec![]);
        let post = service.create(&author, &sample()).await.unwrap();

        let updated = service
            .update(&author, post.id, &payload(json!({"body": "b".repeat(10_000)})))
            .await
            .unwrap();

        assert_eq!(updated.body.chars().count(), 10_000);
        assert_eq!(updated.title, "Hello Sample");
        assert_eq!(posts.raw(post.id).unwrap().body, updated.body);

        let patch = posts.last_patch().unwrap();
        assert_eq!(patch.body.as_deref(), Some(updated.body.as_str()));
        assert_eq!(patch.title, None);
        assert_eq!(patch.category_id, None);
    }

    #[tokio::test]
    async fn test_update_racing_a_delete_reports_not_found() {
        let (service, posts, _) = setup();
        let author = Actor::user(Uuid::new_v4(), vec![]);
        let post = service.create(&author, &sample()).await.unwrap();

        let patch = PostPatch {
            title: Some("Edited".to_string()),
            ..PostPatch::new(Utc::now())
        };
        service.delete(&author, post.id).await.unwrap();

        assert!(posts.patch(post.id, &patch).await.unwrap().is_none());
        assert!(posts.raw(post.id).unwrap().is_trashed());
        assert!(matches!(
            service
                .update(&author, post.id, &payload(json!({"title": "Edited"})))
                .await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_numeric_string_resend_is_not_an_edit() {
        let (service, posts, _) = setup();
        let post = service
            .create(&Actor::user(Uuid::new_v4(), vec![]), &sample())
            .await
            .unwrap();
        let stranger = Actor::user(Uuid::new_v4(), vec![]);

        let same = service
            .update(&stranger, post.id, &payload(json!({"category_id": "1"})))
            .await
            .unwrap();

        assert_eq!(same.updated_at, post.updated_at);
        assert_eq!(posts.writes(), 1);
    }

    #[tokio::test]
    async fn test_update_body_too_long_rejected() {
        let (service, posts, _) = setup();
        let author = Actor::user(Uuid::new_v4(), vec![]);
        let post = service.create(&author, &sample()).await.unwrap();

        let err = service
            .update(&author, post.id, &payload(json!({"body": "b".repeat(10_001)})))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(posts.raw(post.id).unwrap().body, "A valid body of sufficient length.");
    }

    #[tokio::test]
    async fn test_stranger_cannot_update_or_delete() {
        let (service, posts, _) = setup();
        let post = service
            .create(&Actor::user(Uuid::new_v4(), vec![]), &sample())
            .await
            .unwrap();
        let stranger = Actor::user(Uuid::new_v4(), vec!["user".to_string()]);

        let err = service
            .update(&stranger, post.id, &payload(json!({"title": "Hijacked"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized));

        let err = service.delete(&stranger, post.id).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.to_string(), "Not authorized!");

        let stored = posts.raw(post.id).unwrap();
        assert_eq!(stored.title, "Hello Sample");
        assert!(!stored.is_trashed());
    }

    #[tokio::test]
    async fn test_administrator_updates_and_deletes_any_post() {
        let (service, posts, _) = setup();
        let post = service
            .create(&Actor::user(Uuid::new_v4(), vec![]), &sample())
            .await
            .unwrap();
        let admin = Actor::user(Uuid::new_v4(), vec![ADMINISTRATOR_ROLE.to_string()]);

        let updated = service
            .update(&admin, post.id, &payload(json!({"title": "Moderated"})))
            .await
            .unwrap();
        assert_eq!(updated.title, "Moderated");

        service.delete(&admin, post.id).await.unwrap();
        assert!(posts.raw(post.id).unwrap().is_trashed());
        assert!(matches!(
            service.find(post.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unchanged_update_skips_write() {
        let (service, posts, _) = setup();
        let author = Actor::user(Uuid::new_v4(), vec![]);
        let post = service.create(&author, &sample()).await.unwrap();

        let same = service
            .update(&author, post.id, &payload(json!({"title": "Hello Sample"})))
            .await
            .unwrap();

        assert_eq!(same, post);
        assert_eq!(posts.writes(), 1);
    }

    #[tokio::test]
    async fn test_author_relationship_and_listing() {
        let (service, _, users) = setup();
        let user = User::new("writer@example.com".to_string(), "hash".to_string());
        users.insert(user.clone()).await.unwrap();
        let actor = Actor::user(user.id, user.roles.clone());

        let post = service.create(&actor, &sample()).await.unwrap();
        service.create(&actor, &sample()).await.unwrap();

        assert_eq!(service.author(&post).await.unwrap().email, "writer@example.com");
        assert_eq!(service.list_by_author(user.id).await.unwrap().len(), 2);
    }
}
