//! Nova wide-column store access
//!
//! Typed access to a partition/sort-key store with two interchangeable backends:
//! - `DynamoStore` for production (DynamoDB or a compatible endpoint)
//! - `MemoryStore` for tests and local development
//!
//! Both honour the same contract: conditional single-item writes, reverse range
//! queries with continuation keys, filtered scans, bounded bulk reads/writes and
//! all-or-nothing transactions.

mod dynamo;
mod error;
mod memory;
mod request;
pub mod token;
mod value;

pub use dynamo::{DynamoConfig, DynamoStore};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use request::{Condition, Filter, Page, Query, Scan, Update, WriteOp};
pub use value::{index_key_attrs, AttrValue, Item, ItemExt, Key, Numeric, PK, SK};

use async_trait::async_trait;

/// Maximum number of keys per bulk read.
pub const BATCH_GET_LIMIT: usize = 100;
/// Maximum number of items per bulk write.
pub const BATCH_WRITE_LIMIT: usize = 25;
/// Maximum number of operations per transaction.
pub const TRANSACT_LIMIT: usize = 100;

/// Core store operations
#[async_trait]
pub trait WideColumnStore: Send + Sync {
    /// Point read by primary key.
    async fn get(&self, table: &str, key: &Key) -> StoreResult<Option<Item>>;

    /// Write a full item, replacing any existing version when `condition` holds.
    async fn put(&self, table: &str, item: Item, condition: Option<Condition>) -> StoreResult<()>;

    async fn delete(&self, table: &str, key: &Key, condition: Option<Condition>)
        -> StoreResult<()>;

    async fn update(
        &self,
        table: &str,
        key: &Key,
        update: Update,
        condition: Option<Condition>,
    ) -> StoreResult<()>;

    /// Range query over one partition. `Page::last_key` resumes the query.
    async fn query(&self, query: Query) -> StoreResult<Page>;

    async fn scan(&self, scan: Scan) -> StoreResult<Page>;

    /// Bulk read of at most [`BATCH_GET_LIMIT`] keys. Absent keys are omitted.
    async fn batch_get(&self, table: &str, keys: Vec<Key>) -> StoreResult<Vec<Item>>;

    /// Bulk unconditional write of at most [`BATCH_WRITE_LIMIT`] items.
    async fn batch_put(&self, table: &str, items: Vec<Item>) -> StoreResult<()>;

    /// Apply every operation or none of them.
    async fn transact_write(&self, ops: Vec<WriteOp>) -> StoreResult<()>;
}

pub(crate) fn check_batch(len: usize, limit: usize, what: &str) -> StoreResult<()> {
    if len > limit {
        return Err(StoreError::InvalidInput(format!(
            "{} of {} items exceeds limit of {}",
            what, len, limit
        )));
    }
    Ok(())
}
