//! In-memory store backend
//!
//! Mirrors DynamoDB semantics closely enough for service tests: conditions are
//! evaluated against the stored version, transactions validate every condition
//! before applying anything, and pagination hands out last-evaluated keys.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::request::{Condition, Page, Query, Scan, Update, WriteOp};
use crate::value::{index_key_attrs, AttrValue, Item, Key, PK, SK};
use crate::{check_batch, WideColumnStore, BATCH_GET_LIMIT, BATCH_WRITE_LIMIT, TRANSACT_LIMIT};

type Table = BTreeMap<Key, Item>;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    outages: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation touching `table` fail with `Unavailable` until cleared.
    pub async fn set_outage(&self, table: &str, down: bool) {
        let mut outages = self.outages.write().await;
        if down {
            outages.insert(table.to_string());
        } else {
            outages.remove(table);
        }
    }

    /// Number of items currently stored in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }

    async fn ensure_up(&self, table: &str) -> StoreResult<()> {
        if self.outages.read().await.contains(table) {
            return Err(StoreError::Unavailable(format!("table {} is unreachable", table)));
        }
        Ok(())
    }
}

fn key_of(item: &Item) -> StoreResult<Key> {
    Key::from_item(item).map_err(|e| StoreError::InvalidInput(e.to_string()))
}

fn check(condition: Option<&Condition>, current: Option<&Item>) -> bool {
    condition.map(|c| c.holds(current)).unwrap_or(true)
}

fn apply_update(table: &mut Table, key: &Key, update: &Update) -> StoreResult<()> {
    let item = table.entry(key.clone()).or_insert_with(|| key.to_item());
    for (attr, delta) in &update.add {
        let current = match item.get(attr) {
            Some(value) => value.as_i64()?,
            None => 0,
        };
        item.insert(attr.clone(), AttrValue::n(current + delta));
    }
    for (attr, value) in &update.set {
        item.insert(attr.clone(), value.clone());
    }
    Ok(())
}

/// Attributes making up the last-evaluated key for a query on `index`.
fn page_key(item: &Item, index: Option<&(String, String)>) -> Item {
    let mut attrs = vec![PK, SK];
    if let Some((ipk, isk)) = index {
        attrs.push(ipk);
        attrs.push(isk);
    }
    attrs
        .into_iter()
        .filter_map(|a| item.get(a).map(|v| (a.to_string(), v.clone())))
        .collect()
}

#[async_trait]
impl WideColumnStore for MemoryStore {
    async fn get(&self, table: &str, key: &Key) -> StoreResult<Option<Item>> {
        self.ensure_up(table).await?;
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    async fn put(&self, table: &str, item: Item, condition: Option<Condition>) -> StoreResult<()> {
        self.ensure_up(table).await?;
        let key = key_of(&item)?;
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();
        if !check(condition.as_ref(), t.get(&key)) {
            return Err(StoreError::ConditionFailed);
        }
        t.insert(key, item);
        Ok(())
    }

    async fn delete(
        &self,
        table: &str,
        key: &Key,
        condition: Option<Condition>,
    ) -> StoreResult<()> {
        self.ensure_up(table).await?;
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();
        if !check(condition.as_ref(), t.get(key)) {
            return Err(StoreError::ConditionFailed);
        }
        t.remove(key);
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        key: &Key,
        update: Update,
        condition: Option<Condition>,
    ) -> StoreResult<()> {
        self.ensure_up(table).await?;
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();
        if !check(condition.as_ref(), t.get(key)) {
            return Err(StoreError::ConditionFailed);
        }
        apply_update(t, key, &update)
    }

    async fn query(&self, query: Query) -> StoreResult<Page> {
        self.ensure_up(&query.table).await?;
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&query.table) else {
            return Ok(Page::default());
        };

        let index = query.index.as_deref().map(index_key_attrs);
        let (pk_attr, sk_attr) = index
            .clone()
            .unwrap_or_else(|| (PK.to_string(), SK.to_string()));

        let position = |item: &Item| -> Option<(String, Key)> {
            let sort = item.get(&sk_attr)?.as_str()?.to_string();
            Some((sort, Key::from_item(item).ok()?))
        };

        let mut matched: Vec<((String, Key), &Item)> = table
            .values()
            .filter(|item| {
                item.get(&pk_attr).and_then(AttrValue::as_str) == Some(query.partition.as_str())
            })
            .filter_map(|item| position(item).map(|p| (p, item)))
            .filter(|((sort, _), _)| {
                query
                    .sort_prefix
                    .as_deref()
                    .map(|prefix| sort.starts_with(prefix))
                    .unwrap_or(true)
            })
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        if !query.forward {
            matched.reverse();
        }

        if let Some(start) = &query.start {
            let start = position(start)
                .ok_or_else(|| StoreError::InvalidInput("start key missing key attributes".into()))?;
            matched.retain(|(pos, _)| {
                if query.forward {
                    *pos > start
                } else {
                    *pos < start
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        let more = matched.len() > limit;
        let items: Vec<Item> = matched
            .into_iter()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect();
        let last_key = if more {
            items.last().map(|item| page_key(item, index.as_ref()))
        } else {
            None
        };
        Ok(Page { items, last_key })
    }

    async fn scan(&self, scan: Scan) -> StoreResult<Page> {
        self.ensure_up(&scan.table).await?;
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&scan.table) else {
            return Ok(Page::default());
        };

        let start = scan.start.as_ref().map(key_of).transpose()?;
        let mut remaining = table
            .iter()
            .filter(|(key, _)| start.as_ref().map(|s| *key > s).unwrap_or(true))
            .peekable();

        let limit = scan.limit.unwrap_or(usize::MAX);
        let mut items = Vec::new();
        let mut evaluated = 0;
        let mut last = None;
        while evaluated < limit {
            let Some((key, item)) = remaining.next() else {
                break;
            };
            evaluated += 1;
            last = Some(key);
            if scan.filters.iter().all(|f| f.matches(item)) {
                items.push(item.clone());
            }
        }

        let last_key = match (last, remaining.peek()) {
            (Some(key), Some(_)) => Some(key.to_item()),
            _ => None,
        };
        Ok(Page { items, last_key })
    }

    async fn batch_get(&self, table: &str, keys: Vec<Key>) -> StoreResult<Vec<Item>> {
        check_batch(keys.len(), BATCH_GET_LIMIT, "batch get")?;
        self.ensure_up(table).await?;
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(keys.iter().filter_map(|k| t.get(k).cloned()).collect())
    }

    async fn batch_put(&self, table: &str, items: Vec<Item>) -> StoreResult<()> {
        check_batch(items.len(), BATCH_WRITE_LIMIT, "batch write")?;
        self.ensure_up(table).await?;
        let keyed = items
            .into_iter()
            .map(|item| key_of(&item).map(|key| (key, item)))
            .collect::<StoreResult<Vec<_>>>()?;
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(keyed);
        Ok(())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        check_batch(ops.len(), TRANSACT_LIMIT, "transaction")?;
        for op in &ops {
            self.ensure_up(op.table()).await?;
        }

        let mut tables = self.tables.write().await;

        let mut failed = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            let (table, key, condition) = match op {
                WriteOp::Put { table, item, condition } => (table, key_of(item)?, condition),
                WriteOp::Delete { table, key, condition }
                | WriteOp::Update { table, key, condition, .. } => (table, key.clone(), condition),
            };
            let current = tables.get(table).and_then(|t| t.get(&key));
            if !check(condition.as_ref(), current) {
                failed.push(i);
            }
        }
        if !failed.is_empty() {
            return Err(StoreError::TransactionCanceled { failed });
        }

        for op in ops {
            match op {
                WriteOp::Put { table, item, .. } => {
                    let key = key_of(&item)?;
                    tables.entry(table).or_default().insert(key, item);
                }
                WriteOp::Delete { table, key, .. } => {
                    tables.entry(table).or_default().remove(&key);
                }
                WriteOp::Update {
                    table, key, update, ..
                } => apply_update(tables.entry(table).or_default(), &key, &update)?,
            }
        }
        Ok(())
    }
}
