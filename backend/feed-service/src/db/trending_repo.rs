/// Trending Repository
///
/// Global trending list, one partition per algorithm version. Each run
/// rewrites the top items; leftovers from earlier runs sort below or are
/// deduplicated on read.
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use wide_column::{AttrValue, Item, ItemExt, Key, Query, StoreResult, WideColumnStore};

use crate::db::schema::{
    format_timestamp, parse_timestamp, trending_pk, trending_sk, ENTITY_TRENDING, ENTITY_TYPE,
};
use crate::error::Result;
use crate::models::TrendingItem;

#[async_trait]
pub trait TrendingRepository: Send + Sync {
    /// Write one store batch of items.
    async fn put_items(&self, items: &[TrendingItem]) -> Result<()>;

    /// Highest-scoring items, one per post.
    async fn get_top(&self, limit: usize) -> Result<Vec<TrendingItem>>;
}

#[derive(Clone)]
pub struct TrendingRepo {
    store: Arc<dyn WideColumnStore>,
    table: String,
    algorithm_version: String,
}

impl TrendingRepo {
    pub fn new(
        store: Arc<dyn WideColumnStore>,
        table: impl Into<String>,
        algorithm_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            algorithm_version: algorithm_version.into(),
        }
    }
}

#[async_trait]
impl TrendingRepository for TrendingRepo {
    async fn put_items(&self, items: &[TrendingItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let items = items.iter().map(item_to_attrs).collect();
        self.store.batch_put(&self.table, items).await?;
        Ok(())
    }

    async fn get_top(&self, limit: usize) -> Result<Vec<TrendingItem>> {
        let mut top = Vec::with_capacity(limit);
        let mut seen = HashSet::new();
        let mut start = None;

        while top.len() < limit {
            let page = self
                .store
                .query(
                    Query::partition(&self.table, trending_pk(&self.algorithm_version))
                        .limit(limit)
                        .start_after(start),
                )
                .await?;

            for attrs in &page.items {
                match item_from_attrs(attrs) {
                    Ok(item) if seen.insert(item.post_id.clone()) => top.push(item),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Skipping undecodable trending item"),
                }
                if top.len() == limit {
                    break;
                }
            }

            match page.last_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        Ok(top)
    }
}

fn item_to_attrs(item: &TrendingItem) -> Item {
    let mut attrs = Key::new(
        trending_pk(&item.algorithm_version),
        trending_sk(item.score, &item.post_id),
    )
    .to_item();
    attrs.insert(ENTITY_TYPE.into(), AttrValue::s(ENTITY_TRENDING));
    attrs.insert("post_id".into(), AttrValue::s(&item.post_id));
    attrs.insert("score".into(), AttrValue::n(item.score));
    attrs.insert("algorithm_version".into(), AttrValue::s(&item.algorithm_version));
    attrs.insert(
        "generated_at".into(),
        AttrValue::s(format_timestamp(&item.generated_at)),
    );
    attrs
}

fn item_from_attrs(attrs: &Item) -> StoreResult<TrendingItem> {
    Ok(TrendingItem {
        post_id: attrs.req_s("post_id")?,
        score: attrs.req_f64("score")?,
        algorithm_version: attrs.req_s("algorithm_version")?,
        generated_at: parse_timestamp(attrs, "generated_at")?,
    })
}
