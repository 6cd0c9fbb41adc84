/// Trending API Handlers
///
/// Read access to the latest trending generation
use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::models::TrendingItem;
use crate::services::feed_assembly::MAX_PAGE_SIZE;
use crate::services::TrendingRecommender;

/// Query parameters for GET /trending
#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    /// Limit (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendingResponse {
    pub items: Vec<TrendingItem>,
    pub count: usize,
}

pub struct TrendingHandlerState {
    pub recommender: Arc<TrendingRecommender>,
}

#[get("/trending")]
pub async fn get_trending(
    query: web::Query<TrendingQuery>,
    state: web::Data<TrendingHandlerState>,
) -> Result<HttpResponse> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let items = state.recommender.get_global_trending(limit).await?;
    Ok(HttpResponse::Ok().json(TrendingResponse {
        count: items.len(),
        items,
    }))
}
