use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{PostDraft, PostUpdate};
use crate::services::PostService;

pub struct PostHandlerState {
    pub posts: Arc<PostService>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    pub limit: Option<usize>,
    pub next_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentDeleteParams {
    pub sort_key: String,
}

#[post("/posts")]
pub async fn create_post(
    user: UserId,
    body: web::Json<PostDraft>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    let post = state.posts.create_post(&user.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[get("/posts/{post_id}")]
pub async fn get_post(
    path: web::Path<String>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    let post = state.posts.get_post(&path).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[put("/posts/{post_id}")]
pub async fn update_post(
    user: UserId,
    path: web::Path<String>,
    body: web::Json<PostUpdate>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    let post = state
        .posts
        .update_post(&user.0, &path, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

#[delete("/posts/{post_id}")]
pub async fn delete_post(
    user: UserId,
    path: web::Path<String>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    state.posts.delete_post(&user.0, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/users/{user_id}/posts")]
pub async fn get_user_posts(
    path: web::Path<String>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    let posts = state.posts.get_posts_by_author(&path).await?;
    Ok(HttpResponse::Ok().json(json!({ "posts": posts })))
}

#[post("/posts/{post_id}/like")]
pub async fn like_post(
    user: UserId,
    path: web::Path<String>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    state.posts.like(&user.0, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/posts/{post_id}/like")]
pub async fn unlike_post(
    user: UserId,
    path: web::Path<String>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    state.posts.unlike(&user.0, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/posts/{post_id}/comments")]
pub async fn add_comment(
    user: UserId,
    path: web::Path<String>,
    body: web::Json<CommentBody>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    let comment = state
        .posts
        .add_comment(&user.0, &path, body.into_inner().content)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

#[get("/posts/{post_id}/comments")]
pub async fn list_comments(
    path: web::Path<String>,
    query: web::Query<CommentListParams>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    let next_key = query.next_key.as_deref().filter(|k| !k.is_empty());
    let page = state
        .posts
        .list_comments(&path, query.limit, next_key)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

#[delete("/posts/{post_id}/comments")]
pub async fn delete_comment(
    user: UserId,
    path: web::Path<String>,
    query: web::Query<CommentDeleteParams>,
    state: web::Data<PostHandlerState>,
) -> Result<HttpResponse> {
    state
        .posts
        .delete_comment(&user.0, &path, &query.sort_key)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
