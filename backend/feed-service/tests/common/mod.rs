//! Shared fixtures for feed-service integration tests
//!
//! Everything runs against the in-memory store; the identity service is
//! replaced by `FakeIdentity`.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use wide_column::MemoryStore;

use feed_service::clients::{IdentityLookup, UserRef, UserSummary};
use feed_service::config::TrendingConfig;
use feed_service::db::{FeedRepo, FeedRepository, PostRepo, TrendingRepo};
use feed_service::error::{AppError, Result};
use feed_service::handlers::{
    AuthHandlerState, FeedHandlerState, PostHandlerState, TrendingHandlerState,
};
use feed_service::jobs::{create_fanout_queue, spawn_fanout_worker};
use feed_service::security::TokenBlacklist;
use feed_service::services::{
    FanoutEngine, FeedAssemblyConfig, FeedAssemblyService, PostService, TrendingRecommender,
};

pub const POSTS_TABLE: &str = "Posts";
pub const FEED_TABLE: &str = "UserFeed";
pub const RECS_TABLE: &str = "UserRecommendations";

/// Follow graph and profiles held in memory
#[derive(Default)]
pub struct FakeIdentity {
    followers: RwLock<HashMap<String, Vec<String>>>,
    names: RwLock<HashMap<String, String>>,
}

impl FakeIdentity {
    pub fn follow(&self, follower: &str, followee: &str) {
        self.followers
            .write()
            .unwrap()
            .entry(followee.to_string())
            .or_default()
            .push(follower.to_string());
    }

    pub fn set_name(&self, user_id: &str, name: &str) {
        self.names
            .write()
            .unwrap()
            .insert(user_id.to_string(), name.to_string());
    }
}

#[async_trait]
impl IdentityLookup for FakeIdentity {
    async fn get_user_by_id(&self, user_id: &str) -> Result<UserSummary> {
        let names = self.names.read().unwrap();
        names
            .get(user_id)
            .map(|name| UserSummary {
                id: user_id.to_string(),
                display_name: name.clone(),
            })
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
    }

    async fn get_followers(&self, user_id: &str) -> Result<Vec<UserRef>> {
        let followers = self.followers.read().unwrap();
        Ok(followers
            .get(user_id)
            .map(|ids| ids.iter().map(|id| UserRef { id: id.clone() }).collect())
            .unwrap_or_default())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<FakeIdentity>,
    pub post_repo: Arc<PostRepo>,
    pub feed_repo: Arc<FeedRepo>,
    pub posts: Arc<PostService>,
    pub feed: Arc<FeedAssemblyService>,
    pub recommender: Arc<TrendingRecommender>,
    pub blacklist: TokenBlacklist,
    pub fanout_worker: JoinHandle<()>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(FakeIdentity::default());
        let post_repo = Arc::new(PostRepo::new(store.clone(), POSTS_TABLE));
        let feed_repo = Arc::new(FeedRepo::new(store.clone(), FEED_TABLE));
        let trending_repo = Arc::new(TrendingRepo::new(store.clone(), RECS_TABLE, "trending-v1.0"));

        let engine = FanoutEngine::new(identity.clone(), feed_repo.clone(), 25, 90);
        let (queue, receiver) = create_fanout_queue(64);
        let fanout_worker = spawn_fanout_worker(engine, receiver);

        Self {
            posts: Arc::new(PostService::new(post_repo.clone(), identity.clone(), queue)),
            feed: Arc::new(FeedAssemblyService::new(
                feed_repo.clone(),
                post_repo.clone(),
                trending_repo.clone(),
                identity.clone(),
                FeedAssemblyConfig::default(),
            )),
            recommender: Arc::new(TrendingRecommender::new(
                post_repo.clone(),
                trending_repo,
                TrendingConfig::default(),
            )),
            blacklist: TokenBlacklist::new(Duration::from_secs(60)),
            store,
            identity,
            post_repo,
            feed_repo,
            fanout_worker,
        }
    }

    /// Close the fan-out queue and wait until the worker has finished every
    /// queued job. Returns the store and post repository for inspection.
    pub async fn drain_fanout(self) -> (Arc<MemoryStore>, Arc<PostRepo>) {
        let Harness {
            store,
            post_repo,
            posts,
            fanout_worker,
            ..
        } = self;
        drop(posts);
        tokio::time::timeout(Duration::from_secs(5), fanout_worker)
            .await
            .expect("fan-out worker did not drain")
            .unwrap();
        (store, post_repo)
    }

    /// Poll until `user_id`'s materialized feed holds `count` entries.
    pub async fn wait_for_feed(&self, user_id: &str, count: usize) {
        for _ in 0..200 {
            let slice = self.feed_repo.get_user_feed(user_id, 100, None).await.unwrap();
            if slice.entries.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("feed of {} never reached {} entries", user_id, count);
    }

    pub fn feed_state(&self) -> FeedHandlerState {
        FeedHandlerState {
            feed: self.feed.clone(),
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn post_state(&self) -> PostHandlerState {
        PostHandlerState {
            posts: self.posts.clone(),
        }
    }

    pub fn trending_state(&self) -> TrendingHandlerState {
        TrendingHandlerState {
            recommender: self.recommender.clone(),
        }
    }

    pub fn auth_state(&self) -> AuthHandlerState {
        AuthHandlerState {
            blacklist: self.blacklist.clone(),
        }
    }
}

/// Build the `/api/v1` app the way `main` does, minus logging and metrics.
#[macro_export]
macro_rules! init_app {
    ($harness:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($harness.feed_state()))
                .app_data(actix_web::web::Data::new($harness.post_state()))
                .app_data(actix_web::web::Data::new($harness.trending_state()))
                .app_data(actix_web::web::Data::new($harness.auth_state()))
                .service(
                    actix_web::web::scope("/api/v1")
                        .wrap(feed_service::middleware::GatewayAuthMiddleware::new(
                            $harness.blacklist.clone(),
                        ))
                        .configure(feed_service::handlers::configure),
                ),
        )
        .await
    };
}
