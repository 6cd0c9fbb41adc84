/// Fan-out on write
///
/// Materializes one feed entry per follower when a post is created. Delivery
/// is best effort: a failed batch is logged and counted, the remaining batches
/// still go out, and nothing is retried. Followers who miss a post can still
/// see it through the trending backfill.
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::IdentityLookup;
use crate::db::FeedRepository;
use crate::metrics::jobs as job_metrics;
use crate::models::{FeedEntry, Post};

/// Outcome of one fan-out, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub followers: usize,
    pub entries_written: usize,
    pub chunks_failed: usize,
    /// The follower list could not be read; nothing was written.
    pub follower_lookup_failed: bool,
}

#[derive(Clone)]
pub struct FanoutEngine {
    identity: Arc<dyn IdentityLookup>,
    feeds: Arc<dyn FeedRepository>,
    chunk_size: usize,
    entry_ttl: Duration,
}

impl FanoutEngine {
    pub fn new(
        identity: Arc<dyn IdentityLookup>,
        feeds: Arc<dyn FeedRepository>,
        chunk_size: usize,
        entry_ttl_days: i64,
    ) -> Self {
        Self {
            identity,
            feeds,
            chunk_size: chunk_size.clamp(1, wide_column::BATCH_WRITE_LIMIT),
            entry_ttl: Duration::days(entry_ttl_days),
        }
    }

    pub async fn fan_out(&self, post: &Post) -> FanoutReport {
        let followers = match self.identity.get_followers(&post.author_id).await {
            Ok(followers) => followers,
            Err(e) => {
                error!(
                    post_id = %post.post_id,
                    author_id = %post.author_id,
                    error = %e,
                    "Fan-out aborted: follower lookup failed"
                );
                job_metrics::record_fanout_job("follower_lookup_failed");
                return FanoutReport {
                    follower_lookup_failed: true,
                    ..FanoutReport::default()
                };
            }
        };

        let mut report = FanoutReport {
            followers: followers.len(),
            ..FanoutReport::default()
        };
        if followers.is_empty() {
            debug!(post_id = %post.post_id, "Author has no followers, nothing to fan out");
            job_metrics::record_fanout_job("completed");
            return report;
        }

        let ttl = (chrono::Utc::now() + self.entry_ttl).timestamp();
        let entries: Vec<FeedEntry> = followers
            .into_iter()
            .map(|follower| FeedEntry {
                owner_id: follower.id,
                post_id: post.post_id.clone(),
                author_id: post.author_id.clone(),
                post_created_at: post.created_at,
                ttl,
            })
            .collect();

        for (index, chunk) in entries.chunks(self.chunk_size).enumerate() {
            match self.feeds.put_entries(chunk).await {
                Ok(()) => {
                    report.entries_written += chunk.len();
                    job_metrics::record_fanout_chunk("success");
                }
                Err(e) => {
                    report.chunks_failed += 1;
                    job_metrics::record_fanout_chunk("error");
                    warn!(
                        post_id = %post.post_id,
                        chunk = index,
                        size = chunk.len(),
                        error = %e,
                        "Fan-out chunk failed, continuing with remaining followers"
                    );
                }
            }
        }

        job_metrics::record_fanout_job("completed");
        info!(
            post_id = %post.post_id,
            followers = report.followers,
            written = report.entries_written,
            failed_chunks = report.chunks_failed,
            "Fan-out finished"
        );
        report
    }
}
