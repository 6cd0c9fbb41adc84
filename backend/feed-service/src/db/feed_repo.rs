/// Feed Repository
///
/// Per-user feed partitions materialized by fan-out. Entries are written once
/// and expire through the table's TTL attribute.
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use wide_column::{token, AttrValue, Item, ItemExt, Key, Query, StoreResult, WideColumnStore, PK, SK};

use crate::db::schema::{
    feed_sk, format_timestamp, parse_timestamp, user_pk, ENTITY_FEED, ENTITY_TYPE,
};
use crate::error::Result;
use crate::models::FeedEntry;

const TTL_ATTR: &str = "ttl";

/// One page of a user's feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSlice {
    pub entries: Vec<FeedEntry>,
    pub next_key: Option<String>,
}

#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// Newest-first page of `user_id`'s feed, resuming after `next_key`.
    async fn get_user_feed(
        &self,
        user_id: &str,
        limit: usize,
        next_key: Option<&str>,
    ) -> Result<FeedSlice>;

    /// Unconditional bulk write of at most one store batch of entries.
    async fn put_entries(&self, entries: &[FeedEntry]) -> Result<()>;
}

#[derive(Clone)]
pub struct FeedRepo {
    store: Arc<dyn WideColumnStore>,
    table: String,
}

impl FeedRepo {
    pub fn new(store: Arc<dyn WideColumnStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }
}

#[async_trait]
impl FeedRepository for FeedRepo {
    async fn get_user_feed(
        &self,
        user_id: &str,
        limit: usize,
        next_key: Option<&str>,
    ) -> Result<FeedSlice> {
        let start = next_key.map(|t| token::decode(t, &[PK, SK])).transpose()?;
        let page = self
            .store
            .query(
                Query::partition(&self.table, user_pk(user_id))
                    .limit(limit)
                    .start_after(start),
            )
            .await?;

        let now = Utc::now().timestamp();
        let entries = page
            .items
            .iter()
            .filter_map(|item| match entry_from_item(item) {
                Ok(entry) if entry.ttl > now => Some(entry),
                // Expired but not yet collected by the store.
                Ok(_) => None,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Skipping undecodable feed entry");
                    None
                }
            })
            .collect();

        Ok(FeedSlice {
            entries,
            next_key: page.last_key.as_ref().map(token::encode).transpose()?,
        })
    }

    async fn put_entries(&self, entries: &[FeedEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let items = entries.iter().map(entry_to_item).collect();
        self.store.batch_put(&self.table, items).await?;
        Ok(())
    }
}

fn entry_to_item(entry: &FeedEntry) -> Item {
    let mut item = Key::new(
        user_pk(&entry.owner_id),
        feed_sk(&entry.post_created_at, &entry.post_id),
    )
    .to_item();
    item.insert(ENTITY_TYPE.into(), AttrValue::s(ENTITY_FEED));
    item.insert("post_id".into(), AttrValue::s(&entry.post_id));
    item.insert("author_id".into(), AttrValue::s(&entry.author_id));
    item.insert("feed_owner_id".into(), AttrValue::s(&entry.owner_id));
    item.insert(
        "post_created_at".into(),
        AttrValue::s(format_timestamp(&entry.post_created_at)),
    );
    item.insert(TTL_ATTR.into(), AttrValue::n(entry.ttl));
    item
}

fn entry_from_item(item: &Item) -> StoreResult<FeedEntry> {
    Ok(FeedEntry {
        owner_id: item.req_s("feed_owner_id")?,
        post_id: item.req_s("post_id")?,
        author_id: item.req_s("author_id")?,
        post_created_at: parse_timestamp(item, "post_created_at")?,
        // Older writers stored the TTL as a string; both forms are accepted, junk is not.
        ttl: item.req_i64(TTL_ATTR)?,
    })
}
