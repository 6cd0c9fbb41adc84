/// Trending Recommender
///
/// Periodic batch job: scan recent posts, score, rank, persist the top N.
/// A run moves through `Scanning -> Scoring -> Persisting` and back to `Idle`;
/// only one run may be in flight, later triggers are skipped. A failed run
/// leaves the previous generation in place.
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info};

use super::scoring::{rank, ScoreWeights};
use crate::config::TrendingConfig;
use crate::db::{PostRepository, TrendingRepository};
use crate::error::Result;
use crate::metrics::jobs as job_metrics;
use crate::models::TrendingItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scanning,
    Scoring,
    Persisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { scanned: usize, persisted: usize },
    /// Another run was already in flight.
    Skipped,
}

/// Marks a run as in flight; releasing it returns the recommender to `Idle`
/// on every exit path.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    state: &'a watch::Sender<RunState>,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool, state: &'a watch::Sender<RunState>) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running, state })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(RunState::Idle);
        self.running.store(false, Ordering::Release);
    }
}

pub struct TrendingRecommender {
    posts: Arc<dyn PostRepository>,
    trending: Arc<dyn TrendingRepository>,
    config: TrendingConfig,
    running: AtomicBool,
    state: watch::Sender<RunState>,
}

impl TrendingRecommender {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        trending: Arc<dyn TrendingRepository>,
        config: TrendingConfig,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            posts,
            trending,
            config,
            running: AtomicBool::new(false),
            state,
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    fn weights(&self) -> ScoreWeights {
        ScoreWeights {
            like: self.config.like_weight,
            comment: self.config.comment_weight,
        }
    }

    /// Generate one trending generation unless a run is already in flight.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let Some(_guard) = RunGuard::acquire(&self.running, &self.state) else {
            info!("Trending generation already running, skipping this trigger");
            job_metrics::record_trending_run("skipped");
            return Ok(RunOutcome::Skipped);
        };

        let started = Instant::now();
        let result = self.generate().await;
        job_metrics::record_trending_duration(started.elapsed());

        match &result {
            Ok(RunOutcome::Completed { scanned, persisted }) => {
                job_metrics::record_trending_run("success");
                job_metrics::set_trending_items(*persisted);
                info!(
                    scanned,
                    persisted,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    algorithm_version = %self.config.algorithm_version,
                    "Trending generation completed"
                );
            }
            Ok(RunOutcome::Skipped) => {}
            Err(e) => {
                job_metrics::record_trending_run("error");
                error!(
                    state = ?self.state(),
                    error = %e,
                    "Trending generation failed, previous generation stays active"
                );
            }
        }
        result
    }

    async fn generate(&self) -> Result<RunOutcome> {
        self.state.send_replace(RunState::Scanning);
        let posts = self.posts.get_recent_posts(self.config.lookback_days).await?;

        self.state.send_replace(RunState::Scoring);
        let ranked = rank(&posts, self.weights(), self.config.top_n);

        self.state.send_replace(RunState::Persisting);
        let generated_at = Utc::now();
        let items: Vec<TrendingItem> = ranked
            .into_iter()
            .map(|scored| TrendingItem {
                post_id: scored.post_id,
                score: scored.score,
                algorithm_version: self.config.algorithm_version.clone(),
                generated_at,
            })
            .collect();

        for chunk in items.chunks(wide_column::BATCH_WRITE_LIMIT) {
            self.trending.put_items(chunk).await?;
        }

        Ok(RunOutcome::Completed {
            scanned: posts.len(),
            persisted: items.len(),
        })
    }

    /// Current top trending items, at most `limit`.
    pub async fn get_global_trending(&self, limit: usize) -> Result<Vec<TrendingItem>> {
        self.trending.get_top(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PostRepo, TrendingRepo};
    use crate::models::PostDraft;
    use wide_column::MemoryStore;

    const POSTS: &str = "Posts";
    const RECS: &str = "UserRecommendations";

    async fn setup() -> (Arc<MemoryStore>, Arc<PostRepo>, TrendingRecommender) {
        let store = Arc::new(MemoryStore::new());
        let posts = Arc::new(PostRepo::new(store.clone(), POSTS));
        let trending = Arc::new(TrendingRepo::new(store.clone(), RECS, "trending-v1.0"));
        let recommender = TrendingRecommender::new(posts.clone(), trending, TrendingConfig::default());
        (store, posts, recommender)
    }

    async fn create_with_likes(posts: &PostRepo, likes: usize) -> String {
        let post = posts
            .create_post(PostDraft {
                author_id: "a".into(),
                content: "c".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        for i in 0..likes {
            posts.add_like(&post, &format!("u{}", i)).await.unwrap();
        }
        post.post_id
    }

    #[tokio::test]
    async fn run_persists_ranked_items_and_returns_to_idle() {
        let (_, posts, recommender) = setup().await;
        let popular = create_with_likes(&posts, 3).await;
        let quiet = create_with_likes(&posts, 1).await;

        let outcome = recommender.run_once().await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                scanned: 2,
                persisted: 2
            }
        );
        assert_eq!(recommender.state(), RunState::Idle);

        let top = recommender.get_global_trending(10).await.unwrap();
        let ids: Vec<_> = top.iter().map(|i| i.post_id.clone()).collect();
        assert_eq!(ids, vec![popular, quiet]);
        assert_eq!(top[0].score, 3.0);
    }

    #[tokio::test]
    async fn overlapping_trigger_is_skipped() {
        let (_, _, recommender) = setup().await;
        let held = RunGuard::acquire(&recommender.running, &recommender.state).unwrap();

        assert_eq!(recommender.run_once().await.unwrap(), RunOutcome::Skipped);

        drop(held);
        assert!(matches!(
            recommender.run_once().await.unwrap(),
            RunOutcome::Completed { .. }
        ));
    }

    #[tokio::test]
    async fn failed_run_keeps_previous_generation() {
        let (store, posts, recommender) = setup().await;
        let post_id = create_with_likes(&posts, 2).await;
        recommender.run_once().await.unwrap();

        store.set_outage(POSTS, true).await;
        let err = recommender.run_once().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(recommender.state(), RunState::Idle);

        let top = recommender.get_global_trending(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].post_id, post_id);
    }

    #[tokio::test]
    async fn persist_failure_aborts_the_run() {
        let (store, posts, recommender) = setup().await;
        create_with_likes(&posts, 1).await;
        store.set_outage(RECS, true).await;

        assert!(recommender.run_once().await.is_err());
        assert!(!recommender.running.load(Ordering::Acquire));
    }
}
