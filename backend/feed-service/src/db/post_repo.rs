/// Post Repository
///
/// Posts, likes and comments in the single posts table. Engagement counters
/// only change inside transactions that also write the matching like or
/// comment record.
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use uuid::Uuid;
use wide_column::{
    token, AttrValue, Condition, Filter, Item, ItemExt, Key, Query, Scan, StoreError,
    StoreResult, Update, WideColumnStore, WriteOp, BATCH_GET_LIMIT, PK, SK,
};

use crate::db::schema::{
    comment_sk, format_timestamp, like_sk, parse_timestamp, post_pk, post_sk, user_pk,
    COMMENT_PREFIX, ENTITY_COMMENT, ENTITY_LIKE, ENTITY_POST, ENTITY_TYPE, GSI1, GSI1_PK, GSI1_SK,
    METADATA, POST_PREFIX,
};
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentDraft, CommentPage, Location, MediaItem, Post, PostDraft};

const LIKE_COUNT: &str = "like_count";
const COMMENT_COUNT: &str = "comment_count";

/// Outcome of a bulk lookup by id.
#[derive(Debug, Default)]
pub struct Hydration {
    /// Resolved posts in completion order.
    pub posts: Vec<Post>,
    /// Ids with no post behind them (deleted after fan-out, never existed).
    pub missing: Vec<String>,
    /// Ids whose lookup failed.
    pub failed: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, draft: PostDraft) -> Result<Post>;

    async fn get_post_by_id(&self, post_id: &str) -> Result<Post>;

    async fn get_posts_by_ids(&self, post_ids: &[String]) -> Hydration;

    /// Every post of an author, newest first.
    async fn get_posts_by_author(&self, author_id: &str) -> Result<Vec<Post>>;

    async fn update_post(&self, post: &Post) -> Result<()>;

    async fn delete_post(
        &self,
        author_id: &str,
        post_id: &str,
        created_at: &chrono::DateTime<Utc>,
    ) -> Result<()>;

    async fn add_like(&self, post: &Post, user_id: &str) -> Result<()>;

    async fn remove_like(&self, post: &Post, user_id: &str) -> Result<()>;

    async fn create_comment(&self, post: &Post, draft: CommentDraft) -> Result<Comment>;

    async fn get_comment(&self, post_id: &str, sort_key: &str) -> Result<Comment>;

    async fn list_comments<'a>(
        &self,
        post_id: &str,
        limit: usize,
        next_key: Option<&'a str>,
    ) -> Result<CommentPage>;

    async fn delete_comment(&self, post: &Post, sort_key: &str) -> Result<()>;

    /// Like status per post id. Never fails: unreadable chunks report `false`.
    async fn check_liked_status(&self, post_ids: &[String], user_id: &str)
        -> HashMap<String, bool>;

    /// Full scan for posts created within the last `lookback_days`.
    async fn get_recent_posts(&self, lookback_days: i64) -> Result<Vec<Post>>;
}

#[derive(Clone)]
pub struct PostRepo {
    store: Arc<dyn WideColumnStore>,
    table: String,
}

impl PostRepo {
    pub fn new(store: Arc<dyn WideColumnStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    fn post_key(post: &Post) -> Key {
        Key::new(
            user_pk(&post.author_id),
            post_sk(&post.created_at, &post.post_id),
        )
    }
}

async fn fetch_post(
    store: &dyn WideColumnStore,
    table: &str,
    post_id: &str,
) -> StoreResult<Option<Post>> {
    let page = store
        .query(Query::partition(table, post_pk(post_id)).on_index(GSI1).limit(1))
        .await?;
    page.items.first().map(post_from_item).transpose()
}

#[async_trait]
impl PostRepository for PostRepo {
    async fn create_post(&self, draft: PostDraft) -> Result<Post> {
        if draft.author_id.is_empty() {
            return Err(AppError::InvalidInput("author_id is required".to_string()));
        }
        let now = Utc::now();
        let post = Post {
            post_id: Uuid::new_v4().to_string(),
            author_id: draft.author_id,
            content: draft.content,
            media: draft.media,
            tags: draft.tags,
            location: draft.location,
            like_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.store
            .put(&self.table, post_to_item(&post), Some(Condition::NotExists))
            .await?;

        debug!(post_id = %post.post_id, author_id = %post.author_id, "Post created");
        Ok(post)
    }

    async fn get_post_by_id(&self, post_id: &str) -> Result<Post> {
        fetch_post(self.store.as_ref(), &self.table, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    async fn get_posts_by_ids(&self, post_ids: &[String]) -> Hydration {
        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();
        for post_id in post_ids.iter().filter(|id| seen.insert(id.as_str())) {
            let store = Arc::clone(&self.store);
            let table = self.table.clone();
            let post_id = post_id.clone();
            tasks.spawn(async move {
                let result = fetch_post(store.as_ref(), &table, &post_id).await;
                (post_id, result)
            });
        }

        let mut hydration = Hydration::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(Some(post)))) => hydration.posts.push(post),
                Ok((post_id, Ok(None))) => hydration.missing.push(post_id),
                Ok((post_id, Err(e))) => {
                    warn!(post_id = %post_id, error = %e, "Post lookup failed during hydration");
                    hydration.failed.push(post_id);
                }
                Err(e) => error!("Hydration task aborted: {}", e),
            }
        }
        hydration
    }

    async fn get_posts_by_author(&self, author_id: &str) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let mut start = None;
        loop {
            let page = self
                .store
                .query(
                    Query::partition(&self.table, user_pk(author_id))
                        .sort_prefix(POST_PREFIX)
                        .start_after(start),
                )
                .await?;
            for item in &page.items {
                posts.push(post_from_item(item)?);
            }
            match page.last_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        Ok(posts)
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        let tags = if post.tags.is_empty() {
            AttrValue::L(Vec::new())
        } else {
            AttrValue::Ss(post.tags.clone())
        };
        let location = post
            .location
            .as_ref()
            .map(location_to_attr)
            .unwrap_or(AttrValue::Null(true));

        let update = Update::new()
            .set("content", AttrValue::s(&post.content))
            .set("media", media_to_attr(&post.media))
            .set("tags", tags)
            .set("location", location)
            .set("updated_at", AttrValue::s(format_timestamp(&post.updated_at)));

        self.store
            .update(
                &self.table,
                &Self::post_key(post),
                update,
                Some(Condition::Exists),
            )
            .await
            .map_err(|e| match e {
                StoreError::ConditionFailed => {
                    AppError::NotFound(format!("post {}", post.post_id))
                }
                other => other.into(),
            })
    }

    async fn delete_post(
        &self,
        author_id: &str,
        post_id: &str,
        created_at: &chrono::DateTime<Utc>,
    ) -> Result<()> {
        let key = Key::new(user_pk(author_id), post_sk(created_at, post_id));
        self.store
            .delete(&self.table, &key, Some(Condition::Exists))
            .await
            .map_err(|e| match e {
                StoreError::ConditionFailed => AppError::NotFound(format!("post {}", post_id)),
                other => other.into(),
            })?;
        debug!(post_id = %post_id, "Post deleted; feed entries expire via TTL");
        Ok(())
    }

    async fn add_like(&self, post: &Post, user_id: &str) -> Result<()> {
        let mut like = Key::new(post_pk(&post.post_id), like_sk(user_id)).to_item();
        like.insert(ENTITY_TYPE.into(), AttrValue::s(ENTITY_LIKE));
        like.insert("post_id".into(), AttrValue::s(&post.post_id));
        like.insert("user_id".into(), AttrValue::s(user_id));
        like.insert("created_at".into(), AttrValue::s(format_timestamp(&Utc::now())));

        let ops = vec![
            WriteOp::Put {
                table: self.table.clone(),
                item: like,
                condition: Some(Condition::NotExists),
            },
            WriteOp::Update {
                table: self.table.clone(),
                key: Self::post_key(post),
                update: Update::new().add(LIKE_COUNT, 1),
                condition: Some(Condition::Exists),
            },
        ];

        self.store.transact_write(ops).await.map_err(|e| {
            if e.failed_at(0) {
                AppError::AlreadyLiked
            } else if e.failed_at(1) {
                AppError::NotFound(format!("post {}", post.post_id))
            } else {
                e.into()
            }
        })
    }

    async fn remove_like(&self, post: &Post, user_id: &str) -> Result<()> {
        let ops = vec![
            WriteOp::Delete {
                table: self.table.clone(),
                key: Key::new(post_pk(&post.post_id), like_sk(user_id)),
                condition: Some(Condition::Exists),
            },
            WriteOp::Update {
                table: self.table.clone(),
                key: Self::post_key(post),
                update: Update::new().add(LIKE_COUNT, -1),
                condition: Some(Condition::Exists.and(Condition::greater_than(LIKE_COUNT, 0))),
            },
        ];

        self.store.transact_write(ops).await.map_err(|e| {
            if e.failed_at(0) {
                AppError::NotLiked
            } else if e.failed_at(1) {
                AppError::Conflict(format!("like count of post {} is already zero", post.post_id))
            } else {
                e.into()
            }
        })
    }

    async fn create_comment(&self, post: &Post, draft: CommentDraft) -> Result<Comment> {
        let now = Utc::now();
        let comment_id = Uuid::new_v4().to_string();
        let comment = Comment {
            post_id: post.post_id.clone(),
            sort_key: comment_sk(&now, &comment_id),
            comment_id,
            author_id: draft.author_id,
            author_name: draft.author_name,
            content: draft.content,
            created_at: now,
        };

        let ops = vec![
            WriteOp::Put {
                table: self.table.clone(),
                item: comment_to_item(&comment),
                condition: Some(Condition::NotExists),
            },
            WriteOp::Update {
                table: self.table.clone(),
                key: Self::post_key(post),
                update: Update::new().add(COMMENT_COUNT, 1),
                condition: Some(Condition::Exists),
            },
        ];

        self.store.transact_write(ops).await.map_err(|e| {
            if e.failed_at(1) {
                AppError::NotFound(format!("post {}", post.post_id))
            } else if e.failed_at(0) {
                AppError::Conflict(format!("comment {} already exists", comment.comment_id))
            } else {
                e.into()
            }
        })?;
        Ok(comment)
    }

    async fn get_comment(&self, post_id: &str, sort_key: &str) -> Result<Comment> {
        if !sort_key.starts_with(COMMENT_PREFIX) {
            return Err(AppError::InvalidInput(format!("not a comment key: {}", sort_key)));
        }
        let item = self
            .store
            .get(&self.table, &Key::new(post_pk(post_id), sort_key))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", sort_key)))?;
        Ok(comment_from_item(&item)?)
    }

    async fn list_comments<'a>(
        &self,
        post_id: &str,
        limit: usize,
        next_key: Option<&'a str>,
    ) -> Result<CommentPage> {
        let start = next_key.map(|t| token::decode(t, &[PK, SK])).transpose()?;
        let page = self
            .store
            .query(
                Query::partition(&self.table, post_pk(post_id))
                    .sort_prefix(COMMENT_PREFIX)
                    .forward(true)
                    .limit(limit)
                    .start_after(start),
            )
            .await?;

        let comments = page
            .items
            .iter()
            .map(comment_from_item)
            .collect::<StoreResult<Vec<_>>>()?;
        let next_key = page.last_key.as_ref().map(token::encode).transpose()?;
        Ok(CommentPage { comments, next_key })
    }

    async fn delete_comment(&self, post: &Post, sort_key: &str) -> Result<()> {
        let ops = vec![
            WriteOp::Delete {
                table: self.table.clone(),
                key: Key::new(post_pk(&post.post_id), sort_key),
                condition: Some(Condition::Exists),
            },
            WriteOp::Update {
                table: self.table.clone(),
                key: Self::post_key(post),
                update: Update::new().add(COMMENT_COUNT, -1),
                condition: Some(Condition::Exists.and(Condition::greater_than(COMMENT_COUNT, 0))),
            },
        ];

        self.store.transact_write(ops).await.map_err(|e| {
            if e.failed_at(0) {
                AppError::NotFound(format!("comment {}", sort_key))
            } else if e.failed_at(1) {
                AppError::Conflict(format!(
                    "comment count of post {} is already zero",
                    post.post_id
                ))
            } else {
                e.into()
            }
        })
    }

    async fn check_liked_status(
        &self,
        post_ids: &[String],
        user_id: &str,
    ) -> HashMap<String, bool> {
        let mut status: HashMap<String, bool> =
            post_ids.iter().map(|id| (id.clone(), false)).collect();
        let unique: Vec<&String> = {
            let mut seen = HashSet::new();
            post_ids.iter().filter(|id| seen.insert(id.as_str())).collect()
        };

        for chunk in unique.chunks(BATCH_GET_LIMIT) {
            let keys = chunk
                .iter()
                .map(|id| Key::new(post_pk(id), like_sk(user_id)))
                .collect();
            match self.store.batch_get(&self.table, keys).await {
                Ok(items) => {
                    for item in items {
                        if let Ok(post_id) = item.req_s("post_id") {
                            status.insert(post_id, true);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        chunk_size = chunk.len(),
                        error = %e,
                        "Like status check failed, defaulting chunk to not liked"
                    );
                }
            }
        }
        status
    }

    async fn get_recent_posts(&self, lookback_days: i64) -> Result<Vec<Post>> {
        let cutoff = Utc::now() - Duration::days(lookback_days);
        let scan = Scan::table(&self.table)
            .filter(Filter::Eq(ENTITY_TYPE.into(), AttrValue::s(ENTITY_POST)))
            .filter(Filter::Ge("created_at".into(), AttrValue::s(format_timestamp(&cutoff))));

        let mut posts = Vec::new();
        let mut start = None;
        loop {
            let page = self.store.scan(scan.clone().start_after(start)).await?;
            for item in &page.items {
                match post_from_item(item) {
                    Ok(post) => posts.push(post),
                    Err(e) => warn!(error = %e, "Skipping undecodable post during scan"),
                }
            }
            match page.last_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        Ok(posts)
    }
}

fn media_to_attr(media: &[MediaItem]) -> AttrValue {
    AttrValue::L(
        media
            .iter()
            .map(|m| {
                AttrValue::M(HashMap::from([
                    ("type".to_string(), AttrValue::s(&m.media_type)),
                    ("url".to_string(), AttrValue::s(&m.url)),
                ]))
            })
            .collect(),
    )
}

fn location_to_attr(location: &Location) -> AttrValue {
    AttrValue::M(HashMap::from([
        ("name".to_string(), AttrValue::s(&location.name)),
        ("latitude".to_string(), AttrValue::n(location.latitude)),
        ("longitude".to_string(), AttrValue::n(location.longitude)),
    ]))
}

fn post_to_item(post: &Post) -> Item {
    let mut item = PostRepo::post_key(post).to_item();
    item.insert(GSI1_PK.into(), AttrValue::s(post_pk(&post.post_id)));
    item.insert(GSI1_SK.into(), AttrValue::s(METADATA));
    item.insert(ENTITY_TYPE.into(), AttrValue::s(ENTITY_POST));
    item.insert("post_id".into(), AttrValue::s(&post.post_id));
    item.insert("author_id".into(), AttrValue::s(&post.author_id));
    item.insert("content".into(), AttrValue::s(&post.content));
    item.insert("media".into(), media_to_attr(&post.media));
    if !post.tags.is_empty() {
        item.insert("tags".into(), AttrValue::Ss(post.tags.clone()));
    }
    if let Some(location) = &post.location {
        item.insert("location".into(), location_to_attr(location));
    }
    item.insert(LIKE_COUNT.into(), AttrValue::n(post.like_count));
    item.insert(COMMENT_COUNT.into(), AttrValue::n(post.comment_count));
    item.insert("created_at".into(), AttrValue::s(format_timestamp(&post.created_at)));
    item.insert("updated_at".into(), AttrValue::s(format_timestamp(&post.updated_at)));
    item
}

fn media_from_attr(value: Option<&AttrValue>) -> StoreResult<Vec<MediaItem>> {
    let entries = match value {
        None | Some(AttrValue::Null(_)) => return Ok(Vec::new()),
        Some(AttrValue::L(entries)) => entries,
        Some(other) => {
            return Err(StoreError::Decode(format!(
                "media has type {}, expected L",
                other.type_name()
            )))
        }
    };
    entries
        .iter()
        .map(|entry| match entry {
            AttrValue::M(fields) => Ok(MediaItem {
                media_type: fields.req_s("type")?,
                url: fields.req_s("url")?,
            }),
            other => Err(StoreError::Decode(format!(
                "media entry has type {}, expected M",
                other.type_name()
            ))),
        })
        .collect()
}

fn location_from_attr(value: Option<&AttrValue>) -> StoreResult<Option<Location>> {
    match value {
        None | Some(AttrValue::Null(_)) => Ok(None),
        Some(AttrValue::M(fields)) => Ok(Some(Location {
            name: fields.req_s("name")?,
            latitude: fields.req_f64("latitude")?,
            longitude: fields.req_f64("longitude")?,
        })),
        Some(other) => Err(StoreError::Decode(format!(
            "location has type {}, expected M",
            other.type_name()
        ))),
    }
}

fn post_from_item(item: &Item) -> StoreResult<Post> {
    Ok(Post {
        post_id: item.req_s("post_id")?,
        author_id: item.req_s("author_id")?,
        content: item.req_s("content")?,
        media: media_from_attr(item.get("media"))?,
        tags: item.string_set("tags")?,
        location: location_from_attr(item.get("location"))?,
        like_count: item.opt_i64(LIKE_COUNT)?.unwrap_or(0),
        comment_count: item.opt_i64(COMMENT_COUNT)?.unwrap_or(0),
        created_at: parse_timestamp(item, "created_at")?,
        updated_at: parse_timestamp(item, "updated_at")?,
    })
}

fn comment_to_item(comment: &Comment) -> Item {
    let mut item = Key::new(post_pk(&comment.post_id), &comment.sort_key).to_item();
    item.insert(ENTITY_TYPE.into(), AttrValue::s(ENTITY_COMMENT));
    item.insert("post_id".into(), AttrValue::s(&comment.post_id));
    item.insert("comment_id".into(), AttrValue::s(&comment.comment_id));
    item.insert("author_id".into(), AttrValue::s(&comment.author_id));
    item.insert("author_name".into(), AttrValue::s(&comment.author_name));
    item.insert("content".into(), AttrValue::s(&comment.content));
    item.insert("created_at".into(), AttrValue::s(format_timestamp(&comment.created_at)));
    item
}

fn comment_from_item(item: &Item) -> StoreResult<Comment> {
    Ok(Comment {
        post_id: item.req_s("post_id")?,
        comment_id: item.req_s("comment_id")?,
        sort_key: item.req_s(SK)?,
        author_id: item.req_s("author_id")?,
        author_name: item.req_s("author_name")?,
        content: item.req_s("content")?,
        created_at: parse_timestamp(item, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wide_column::MemoryStore;

    const TABLE: &str = "Posts";

    fn repo() -> (Arc<MemoryStore>, PostRepo) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), PostRepo::new(store, TABLE))
    }

    fn draft(author: &str) -> PostDraft {
        PostDraft {
            author_id: author.to_string(),
            content: "hello".to_string(),
            media: vec![MediaItem {
                media_type: "image".to_string(),
                url: "https://cdn.example/a.png".to_string(),
            }],
            tags: vec!["rust".to_string()],
            location: Some(Location {
                name: "Taipei".to_string(),
                latitude: 25.03,
                longitude: 121.56,
            }),
        }
    }

    #[tokio::test]
    async fn post_round_trips_through_the_table() {
        let (_, repo) = repo();
        let created = repo.create_post(draft("a")).await.unwrap();
        let fetched = repo.get_post_by_id(&created.post_id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let (_, repo) = repo();
        assert!(matches!(
            repo.get_post_by_id("nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_uses_the_same_sort_key_as_create() {
        let (_, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();
        repo.delete_post(&post.author_id, &post.post_id, &post.created_at)
            .await
            .unwrap();
        assert!(repo.get_post_by_id(&post.post_id).await.is_err());
        assert!(matches!(
            repo.delete_post(&post.author_id, &post.post_id, &post.created_at)
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unlike_never_drives_the_counter_negative() {
        let (_, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();

        assert_eq!(repo.remove_like(&post, "u").await, Err(AppError::NotLiked));
        assert_eq!(repo.get_post_by_id(&post.post_id).await.unwrap().like_count, 0);

        repo.add_like(&post, "u").await.unwrap();
        repo.remove_like(&post, "u").await.unwrap();
        assert_eq!(repo.get_post_by_id(&post.post_id).await.unwrap().like_count, 0);
    }

    #[tokio::test]
    async fn liking_a_deleted_post_is_not_found() {
        let (_, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();
        repo.delete_post(&post.author_id, &post.post_id, &post.created_at)
            .await
            .unwrap();
        assert!(matches!(
            repo.add_like(&post, "u").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn comments_keep_the_counter_in_step() {
        let (_, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();
        let comment = repo
            .create_comment(
                &post,
                CommentDraft {
                    author_id: "b".into(),
                    author_name: "Bea".into(),
                    content: "nice".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(repo.get_post_by_id(&post.post_id).await.unwrap().comment_count, 1);

        let page = repo.list_comments(&post.post_id, 10, None).await.unwrap();
        assert_eq!(page.comments, vec![comment.clone()]);

        repo.delete_comment(&post, &comment.sort_key).await.unwrap();
        assert_eq!(repo.get_post_by_id(&post.post_id).await.unwrap().comment_count, 0);
        assert!(matches!(
            repo.delete_comment(&post, &comment.sort_key).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn liked_status_degrades_to_false_on_outage() {
        let (store, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();
        repo.add_like(&post, "u").await.unwrap();

        let ids = vec![post.post_id.clone(), "other".to_string()];
        let status = repo.check_liked_status(&ids, "u").await;
        assert_eq!(status[&post.post_id], true);
        assert_eq!(status["other"], false);

        store.set_outage(TABLE, true).await;
        let status = repo.check_liked_status(&ids, "u").await;
        assert!(status.values().all(|liked| !liked));
    }

    #[tokio::test]
    async fn hydration_separates_missing_from_failed() {
        let (store, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();

        let ids = vec![post.post_id.clone(), "gone".to_string(), post.post_id.clone()];
        let hydration = repo.get_posts_by_ids(&ids).await;
        assert_eq!(hydration.posts.len(), 1);
        assert_eq!(hydration.missing, vec!["gone".to_string()]);
        assert!(hydration.failed.is_empty());

        store.set_outage(TABLE, true).await;
        let hydration = repo.get_posts_by_ids(&ids).await;
        assert!(hydration.posts.is_empty());
        assert_eq!(hydration.failed.len(), 2);
    }

    #[tokio::test]
    async fn recent_posts_exclude_likes_and_comments() {
        let (_, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();
        repo.add_like(&post, "u").await.unwrap();

        let recent = repo.get_recent_posts(7).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].like_count, 1);
    }

    #[tokio::test]
    async fn string_encoded_counters_are_accepted() {
        let (store, repo) = repo();
        let post = repo.create_post(draft("a")).await.unwrap();
        let mut item = post_to_item(&post);
        item.insert(LIKE_COUNT.into(), AttrValue::s("7"));
        store.put(TABLE, item, None).await.unwrap();

        assert_eq!(repo.get_post_by_id(&post.post_id).await.unwrap().like_count, 7);
    }
}
