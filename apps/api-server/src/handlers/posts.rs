//! Post handlers.
//!
//! Create/update bodies are taken as raw JSON objects and handed to the post
//! service, which validates them field by field before anything is written.

use actix_web::{HttpResponse, web};
use scribe_core::Attributes;
use scribe_core::domain::Post;
use scribe_shared::ApiResponse;
use scribe_shared::dto::PostResponse;
use uuid::Uuid;

use super::auth::user_response;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

pub(crate) fn post_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id.to_string(),
        author_id: post.author_id.to_string(),
        category_id: post.category_id,
        title: post.title,
        body: post.body,
        image: post.image,
        url: post.url,
        created_at: post.created_at.to_rfc3339(),
        updated_at: post.updated_at.to_rfc3339(),
    }
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<Attributes>,
) -> AppResult<HttpResponse> {
    let post = state.posts.create(&identity.actor(), &body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post_response(post))))
}

/// GET /api/posts/{id}
pub async fn show(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = state.posts.find(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(post))))
}

/// PATCH /api/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<Attributes>,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .update(&identity.actor(), path.into_inner(), &body)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(post))))
}

/// DELETE /api/posts/{id}
pub async fn destroy(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(&identity.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/posts/{id}/author
pub async fn author(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = state.posts.find(path.into_inner()).await?;
    let user = state.posts.author(&post).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(user))))
}

/// GET /api/users/{id}/posts
pub async fn by_author(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let posts: Vec<PostResponse> = state
        .posts
        .list_by_author(path.into_inner())
        .await?
        .into_iter()
        .map(post_response)
        .collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}
