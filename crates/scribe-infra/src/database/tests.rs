use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use scribe_core::domain::{Post, PostPatch};
use scribe_core::error::RepoError;
use scribe_core::ports::{BaseRepository, PostRepository};

use crate::database::entity::post;
use crate::database::postgres_repo::PostgresPostRepository;

fn post_row(id: Uuid, author_id: Uuid) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        author_id,
        category_id: 4,
        title: "Test Post".to_owned(),
        body: "Content of the test post".to_owned(),
        image: None,
        url: Some("https://example.com/test-post".to_owned()),
        created_at: now.into(),
        updated_at: now.into(),
        deleted_at: None,
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::new_v4();
    let author_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_row(post_id, author_id)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.author_id, author_id);
    assert_eq!(post.category_id, 4);
}

#[tokio::test]
async fn test_find_post_by_id_filters_trashed_rows() {
    let post_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();
    assert!(result.is_none());

    let log = db.into_transaction_log();
    let sql = format!("{:?}", log);
    assert!(sql.contains("deleted_at") && sql.contains("IS NULL"), "{}", sql);
}

#[tokio::test]
async fn test_soft_delete_marks_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    repo.soft_delete(Uuid::new_v4(), Utc::now()).await.unwrap();
}

#[tokio::test]
async fn test_soft_delete_missing_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let result = repo.soft_delete(Uuid::new_v4(), Utc::now()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_find_by_author() {
    let author_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            post_row(Uuid::new_v4(), author_id),
            post_row(Uuid::new_v4(), author_id),
        ]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let posts = repo.find_by_author(author_id).await.unwrap();

    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| p.author_id == author_id));
}

#[tokio::test]
async fn test_patch_writes_changed_columns_of_live_row() {
    let post_id = Uuid::new_v4();
    let mut row = post_row(post_id, Uuid::new_v4());
    row.title = "Patched".to_owned();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .append_query_results([vec![row]])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    let patch = PostPatch {
        title: Some("Patched".to_string()),
        ..PostPatch::new(Utc::now())
    };
    let post = repo.patch(post_id, &patch).await.unwrap().unwrap();
    assert_eq!(post.title, "Patched");

    let sql = format!("{:?}", db.into_transaction_log());
    let update = sql.split("SELECT").next().unwrap_or_default();
    assert!(update.contains("title"), "{}", update);
    assert!(!update.contains("body"), "{}", update);
    assert!(update.contains("deleted_at") && update.contains("IS NULL"), "{}", update);
}

#[tokio::test]
async fn test_patch_on_trashed_row_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let patch = PostPatch {
        body: Some("Stale body".to_string()),
        ..PostPatch::new(Utc::now())
    };
    assert!(repo.patch(Uuid::new_v4(), &patch).await.unwrap().is_none());
}
