use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::metrics::feed as feed_metrics;
use crate::middleware::UserId;
use crate::services::FeedAssemblyService;

#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    pub limit: Option<usize>,
    pub next_key: Option<String>,
}

pub struct FeedHandlerState {
    pub feed: Arc<FeedAssemblyService>,
    pub request_timeout: Duration,
}

/// One page of `user_id`'s home feed. When the caller is known, each post
/// carries their like status.
#[get("/users/{user_id}/feed")]
pub async fn get_feed(
    path: web::Path<String>,
    query: web::Query<FeedQueryParams>,
    viewer: Option<UserId>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let viewer_id = viewer.map(|UserId(id)| id);
    let next_key = query.next_key.as_deref().filter(|k| !k.is_empty());
    let started = Instant::now();

    let assembled = tokio::time::timeout(
        state.request_timeout,
        state
            .feed
            .get_feed_page(&user_id, viewer_id.as_deref(), query.limit, next_key),
    )
    .await;

    let page = match assembled {
        Ok(Ok(page)) => page,
        Ok(Err(e)) => {
            feed_metrics::record_feed_request("error", started.elapsed());
            return Err(e);
        }
        Err(_) => {
            feed_metrics::record_feed_request("timeout", started.elapsed());
            warn!(
                user_id = %user_id,
                timeout_ms = state.request_timeout.as_millis() as u64,
                "Feed assembly timed out"
            );
            return Err(AppError::Unavailable("feed request timed out".to_string()));
        }
    };

    feed_metrics::record_feed_request("success", started.elapsed());
    debug!(
        user_id = %user_id,
        posts = page.posts.len(),
        has_more = page.next_key.is_some(),
        "Feed page served"
    );
    Ok(HttpResponse::Ok().json(page))
}
