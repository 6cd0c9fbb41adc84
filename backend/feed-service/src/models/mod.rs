use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// System of record for post content and engagement counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-supplied fields for a new post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostDraft {
    #[serde(default)]
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Option<Location>,
}

/// Partial edit of a post; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub media: Option<Vec<MediaItem>>,
    pub tags: Option<Vec<String>>,
    pub location: Option<Location>,
}

impl PostUpdate {
    pub fn apply(self, post: &mut Post) {
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(media) = self.media {
            post.media = media;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(location) = self.location {
            post.location = Some(location);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub post_id: String,
    pub comment_id: String,
    /// Sort key within the post partition; identifies the comment for deletion.
    pub sort_key: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub author_id: String,
    pub author_name: String,
    pub content: String,
}

/// One materialized reference to a post in a follower's feed partition.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub owner_id: String,
    pub post_id: String,
    pub author_id: String,
    pub post_created_at: DateTime<Utc>,
    /// Expiry as epoch seconds.
    pub ttl: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub post_id: String,
    pub score: f64,
    pub algorithm_version: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Following,
    Trending,
}

/// Hydrated post as shown in a feed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_liked: bool,
    pub source: FeedSource,
}

impl FeedPost {
    pub fn from_post(post: Post, author_name: String, is_liked: bool, source: FeedSource) -> Self {
        Self {
            post_id: post.post_id,
            author_id: post.author_id,
            author_name,
            content: post.content,
            media: post.media,
            tags: post.tags,
            location: post.location,
            like_count: post.like_count,
            comment_count: post.comment_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
            is_liked,
            source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<FeedPost>,
    /// Continuation token of the follow feed; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key: Option<String>,
}
