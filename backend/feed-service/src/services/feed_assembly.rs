/// Feed Assembly Service
///
/// Builds one page of a user's home feed:
/// 1. read the materialized follow feed
/// 2. backfill from trending when the follow feed is sparse
/// 3. hydrate post ids into posts, dropping ids whose post is gone
/// 4. attach like status for the viewer and author display names
/// 5. restore the step-3 order and return the follow-feed cursor
///
/// Only the follow-feed read is fatal. Backfill, like status and author names
/// degrade to defaults and are reported through metrics.
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clients::IdentityLookup;
use crate::config::FeedConfig;
use crate::db::{FeedRepository, PostRepository, TrendingRepository};
use crate::error::{AppError, Result};
use crate::metrics::feed as feed_metrics;
use crate::models::{FeedPage, FeedPost, FeedSource};

pub const MAX_PAGE_SIZE: usize = 100;

/// Display names resolved during one request, keyed by user id.
pub type AuthorNameCache = HashMap<String, String>;

/// Label used when an author's profile cannot be read.
pub fn fallback_author_name(user_id: &str) -> String {
    format!("User {}", user_id)
}

#[derive(Debug, Clone)]
pub struct FeedAssemblyConfig {
    pub default_limit: usize,
    pub backfill_threshold: usize,
    pub backfill_overfetch: usize,
}

impl Default for FeedAssemblyConfig {
    fn default() -> Self {
        FeedConfig::default().into()
    }
}

impl From<FeedConfig> for FeedAssemblyConfig {
    fn from(config: FeedConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            backfill_threshold: config.backfill_threshold,
            backfill_overfetch: config.backfill_overfetch,
        }
    }
}

pub struct FeedAssemblyService {
    feeds: Arc<dyn FeedRepository>,
    posts: Arc<dyn PostRepository>,
    trending: Arc<dyn TrendingRepository>,
    identity: Arc<dyn IdentityLookup>,
    config: FeedAssemblyConfig,
}

impl FeedAssemblyService {
    pub fn new(
        feeds: Arc<dyn FeedRepository>,
        posts: Arc<dyn PostRepository>,
        trending: Arc<dyn TrendingRepository>,
        identity: Arc<dyn IdentityLookup>,
        config: FeedAssemblyConfig,
    ) -> Self {
        Self {
            feeds,
            posts,
            trending,
            identity,
            config,
        }
    }

    fn page_size(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub async fn get_feed_page(
        &self,
        user_id: &str,
        viewer_id: Option<&str>,
        limit: Option<usize>,
        next_key: Option<&str>,
    ) -> Result<FeedPage> {
        let limit = self.page_size(limit);

        let slice = self.feeds.get_user_feed(user_id, limit, next_key).await?;

        let mut ordered: Vec<(String, FeedSource)> = Vec::with_capacity(limit);
        let mut present = HashSet::new();
        for entry in slice.entries {
            if present.insert(entry.post_id.clone()) {
                ordered.push((entry.post_id, FeedSource::Following));
            }
        }

        if ordered.len() < self.config.backfill_threshold {
            self.backfill(user_id, limit, &mut ordered, &mut present).await;
        }

        if ordered.is_empty() {
            return Ok(FeedPage {
                posts: Vec::new(),
                next_key: slice.next_key,
            });
        }

        let order: HashMap<String, (usize, FeedSource)> = ordered
            .iter()
            .enumerate()
            .map(|(index, (post_id, source))| (post_id.clone(), (index, *source)))
            .collect();
        let post_ids: Vec<String> = ordered.into_iter().map(|(post_id, _)| post_id).collect();

        let hydration = self.posts.get_posts_by_ids(&post_ids).await;
        if hydration.posts.is_empty() && hydration.missing.is_empty() && !hydration.failed.is_empty()
        {
            return Err(AppError::Unavailable(format!(
                "could not load any of {} posts for feed of {}",
                hydration.failed.len(),
                user_id
            )));
        }
        if !hydration.missing.is_empty() {
            debug!(
                user_id = %user_id,
                missing = hydration.missing.len(),
                "Dropping feed entries for deleted posts"
            );
            feed_metrics::record_hydration_misses(hydration.missing.len());
        }
        if !hydration.failed.is_empty() {
            feed_metrics::record_degraded("hydration");
        }

        let liked = match viewer_id {
            Some(viewer) => {
                let ids: Vec<String> = hydration.posts.iter().map(|p| p.post_id.clone()).collect();
                self.posts.check_liked_status(&ids, viewer).await
            }
            None => HashMap::new(),
        };

        let mut names = AuthorNameCache::new();
        let authors: Vec<String> = hydration.posts.iter().map(|p| p.author_id.clone()).collect();
        self.resolve_author_names(&authors, &mut names).await;

        let mut posts: Vec<FeedPost> = hydration
            .posts
            .into_iter()
            .filter_map(|post| {
                let (_, source) = *order.get(&post.post_id)?;
                let is_liked = liked.get(&post.post_id).copied().unwrap_or(false);
                let author_name = names
                    .get(&post.author_id)
                    .cloned()
                    .unwrap_or_else(|| fallback_author_name(&post.author_id));
                Some(FeedPost::from_post(post, author_name, is_liked, source))
            })
            .collect();
        posts.sort_by_key(|post| order.get(&post.post_id).map(|(index, _)| *index));

        Ok(FeedPage {
            posts,
            next_key: slice.next_key,
        })
    }

    /// Append trending post ids not already on the page until `limit` is
    /// reached. Failures leave the page as it is.
    async fn backfill(
        &self,
        user_id: &str,
        limit: usize,
        ordered: &mut Vec<(String, FeedSource)>,
        present: &mut HashSet<String>,
    ) {
        let recommended = match self.trending.get_top(self.config.backfill_overfetch).await {
            Ok(items) => items,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Trending backfill failed, serving follow feed only");
                feed_metrics::record_backfill("failed");
                feed_metrics::record_degraded("backfill");
                return;
            }
        };

        let before = ordered.len();
        for item in recommended {
            if ordered.len() >= limit {
                break;
            }
            if present.insert(item.post_id.clone()) {
                ordered.push((item.post_id, FeedSource::Trending));
            }
        }
        debug!(
            user_id = %user_id,
            added = ordered.len() - before,
            "Backfilled sparse feed from trending"
        );
        feed_metrics::record_backfill("used");
    }

    /// Fill `cache` with display names for every author not yet in it.
    /// Authors whose profile cannot be read get the fallback label.
    pub async fn resolve_author_names(&self, author_ids: &[String], cache: &mut AuthorNameCache) {
        let mut pending = HashSet::new();
        let lookups: Vec<&String> = author_ids
            .iter()
            .filter(|id| !cache.contains_key(id.as_str()) && pending.insert(id.as_str()))
            .collect();
        if lookups.is_empty() {
            return;
        }

        let results = join_all(lookups.iter().map(|id| self.identity.get_user_by_id(id))).await;
        let mut degraded = false;
        for (author_id, result) in lookups.into_iter().zip(results) {
            let name = match result {
                Ok(user) => user.display_name,
                Err(e) => {
                    degraded = true;
                    debug!(author_id = %author_id, error = %e, "Author lookup failed, using fallback name");
                    fallback_author_name(author_id)
                }
            };
            cache.insert(author_id.clone(), name);
        }
        if degraded {
            feed_metrics::record_degraded("author_name");
        }
    }
}
