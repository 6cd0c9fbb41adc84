//! Trending Refresh Background Job
//!
//! Regenerates the global trending list once at startup and then on a fixed
//! interval. Each tick runs in its own task; a tick that lands while the
//! previous generation is still running is skipped by the recommender.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::services::{RunOutcome, TrendingRecommender};

pub struct TrendingRefreshJob {
    recommender: Arc<TrendingRecommender>,
    interval: Duration,
}

impl TrendingRefreshJob {
    pub fn new(recommender: Arc<TrendingRecommender>, interval: Duration) -> Self {
        Self {
            recommender,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    #[cfg(test)]
    fn with_interval(recommender: Arc<TrendingRecommender>, interval: Duration) -> Self {
        Self {
            recommender,
            interval,
        }
    }

    /// Tick forever; the first tick fires immediately.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Starting trending refresh background job"
        );

        let mut ticker = interval_at(Instant::now(), self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let recommender = Arc::clone(&self.recommender);
            tokio::spawn(async move {
                match recommender.run_once().await {
                    Ok(RunOutcome::Completed { persisted, .. }) => {
                        tracing::debug!(persisted, "Trending refresh tick finished");
                    }
                    Ok(RunOutcome::Skipped) => {}
                    // Already logged by the recommender; the next tick retries.
                    Err(_) => {}
                }
            });
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
