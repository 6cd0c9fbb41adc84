/// Post, like and comment operations behind the HTTP API
///
/// Mutations of a post or comment are limited to its author. Creating a post
/// queues fan-out to followers and returns without waiting for it.
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::clients::IdentityLookup;
use crate::db::PostRepository;
use crate::error::{AppError, Result};
use crate::jobs::fanout_queue::FanoutQueue;
use crate::models::{Comment, CommentDraft, CommentPage, Post, PostDraft, PostUpdate};
use crate::services::feed_assembly::{fallback_author_name, MAX_PAGE_SIZE};

const DEFAULT_COMMENT_PAGE: usize = 20;

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    identity: Arc<dyn IdentityLookup>,
    fanout: FanoutQueue,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        identity: Arc<dyn IdentityLookup>,
        fanout: FanoutQueue,
    ) -> Self {
        Self {
            posts,
            identity,
            fanout,
        }
    }

    pub async fn create_post(&self, author_id: &str, mut draft: PostDraft) -> Result<Post> {
        if draft.content.trim().is_empty() && draft.media.is_empty() {
            return Err(AppError::InvalidInput(
                "post needs content or media".to_string(),
            ));
        }
        draft.author_id = author_id.to_string();

        let post = self.posts.create_post(draft).await?;
        let queued = self.fanout.submit(post.clone());
        info!(
            post_id = %post.post_id,
            author_id = %post.author_id,
            fanout_queued = queued,
            "Post published"
        );
        Ok(post)
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Post> {
        self.posts.get_post_by_id(post_id).await
    }

    pub async fn get_posts_by_author(&self, author_id: &str) -> Result<Vec<Post>> {
        self.posts.get_posts_by_author(author_id).await
    }

    async fn owned_post(&self, actor_id: &str, post_id: &str) -> Result<Post> {
        let post = self.posts.get_post_by_id(post_id).await?;
        if post.author_id != actor_id {
            return Err(AppError::Forbidden(format!(
                "post {} belongs to another user",
                post_id
            )));
        }
        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor_id: &str,
        post_id: &str,
        update: PostUpdate,
    ) -> Result<Post> {
        let mut post = self.owned_post(actor_id, post_id).await?;
        update.apply(&mut post);
        if post.content.trim().is_empty() && post.media.is_empty() {
            return Err(AppError::InvalidInput(
                "post needs content or media".to_string(),
            ));
        }
        post.updated_at = Utc::now();
        self.posts.update_post(&post).await?;
        Ok(post)
    }

    /// Feed entries that still reference the post are dropped at read time.
    pub async fn delete_post(&self, actor_id: &str, post_id: &str) -> Result<()> {
        let post = self.owned_post(actor_id, post_id).await?;
        self.posts
            .delete_post(&post.author_id, &post.post_id, &post.created_at)
            .await
    }

    pub async fn like(&self, user_id: &str, post_id: &str) -> Result<()> {
        let post = self.posts.get_post_by_id(post_id).await?;
        self.posts.add_like(&post, user_id).await
    }

    pub async fn unlike(&self, user_id: &str, post_id: &str) -> Result<()> {
        let post = self.posts.get_post_by_id(post_id).await?;
        self.posts.remove_like(&post, user_id).await
    }

    pub async fn add_comment(&self, user_id: &str, post_id: &str, content: String) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(AppError::InvalidInput("comment content is empty".to_string()));
        }
        let post = self.posts.get_post_by_id(post_id).await?;
        let author_name = match self.identity.get_user_by_id(user_id).await {
            Ok(user) => user.display_name,
            Err(_) => fallback_author_name(user_id),
        };
        self.posts
            .create_comment(
                &post,
                CommentDraft {
                    author_id: user_id.to_string(),
                    author_name,
                    content,
                },
            )
            .await
    }

    pub async fn list_comments(
        &self,
        post_id: &str,
        limit: Option<usize>,
        next_key: Option<&str>,
    ) -> Result<CommentPage> {
        let limit = limit.unwrap_or(DEFAULT_COMMENT_PAGE).clamp(1, MAX_PAGE_SIZE);
        self.posts.list_comments(post_id, limit, next_key).await
    }

    pub async fn delete_comment(&self, actor_id: &str, post_id: &str, sort_key: &str) -> Result<()> {
        let post = self.posts.get_post_by_id(post_id).await?;
        let comment = self.posts.get_comment(post_id, sort_key).await?;
        if comment.author_id != actor_id {
            return Err(AppError::Forbidden(
                "only the comment author can delete it".to_string(),
            ));
        }
        self.posts.delete_comment(&post, sort_key).await
    }
}
