//! DynamoDB store backend

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{
    AttributeValue, Delete, KeysAndAttributes, Put, PutRequest, TransactWriteItem,
    Update as UpdateAction, WriteRequest,
};
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::request::{Condition, Filter, Page, Query, Scan, Update, WriteOp};
use crate::value::{index_key_attrs, AttrValue, Item, Key, PK, SK};
use crate::{check_batch, WideColumnStore, BATCH_GET_LIMIT, BATCH_WRITE_LIMIT, TRANSACT_LIMIT};

type SdkItem = HashMap<String, AttributeValue>;

#[derive(Debug, Clone)]
pub struct DynamoConfig {
    pub region: Option<String>,
    /// Override for DynamoDB Local / LocalStack.
    pub endpoint_url: Option<String>,
    /// Retries for unprocessed items returned by bulk operations.
    pub max_batch_retries: u32,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            max_batch_retries: 5,
        }
    }
}

#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    max_batch_retries: u32,
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_batch_retries: DynamoConfig::default().max_batch_retries,
        }
    }

    pub async fn connect(config: &DynamoConfig) -> Self {
        let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            max_batch_retries: config.max_batch_retries,
        }
    }

    async fn backoff(&self, attempt: u32, what: &str) -> StoreResult<()> {
        if attempt > self.max_batch_retries {
            return Err(StoreError::Unavailable(format!(
                "{} still unprocessed after {} retries",
                what, self.max_batch_retries
            )));
        }
        let delay = Duration::from_millis(50 * 2u64.pow(attempt.min(6)));
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying unprocessed {}", what);
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

fn to_sdk(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::S(s) => AttributeValue::S(s.clone()),
        AttrValue::N(n) => AttributeValue::N(n.clone()),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::Null(b) => AttributeValue::Null(*b),
        AttrValue::L(values) => AttributeValue::L(values.iter().map(to_sdk).collect()),
        AttrValue::M(map) => {
            AttributeValue::M(map.iter().map(|(k, v)| (k.clone(), to_sdk(v))).collect())
        }
        AttrValue::Ss(values) => AttributeValue::Ss(values.clone()),
    }
}

fn from_sdk(value: &AttributeValue) -> StoreResult<AttrValue> {
    Ok(match value {
        AttributeValue::S(s) => AttrValue::S(s.clone()),
        AttributeValue::N(n) => AttrValue::N(n.clone()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::Null(b) => AttrValue::Null(*b),
        AttributeValue::L(values) => {
            AttrValue::L(values.iter().map(from_sdk).collect::<StoreResult<_>>()?)
        }
        AttributeValue::M(map) => AttrValue::M(
            map.iter()
                .map(|(k, v)| from_sdk(v).map(|v| (k.clone(), v)))
                .collect::<StoreResult<_>>()?,
        ),
        AttributeValue::Ss(values) => AttrValue::Ss(values.clone()),
        other => {
            return Err(StoreError::Decode(format!(
                "unsupported attribute type: {:?}",
                other
            )))
        }
    })
}

fn to_sdk_item(item: &Item) -> SdkItem {
    item.iter()
        // DynamoDB rejects empty sets.
        .filter(|(_, v)| !matches!(v, AttrValue::Ss(s) if s.is_empty()))
        .map(|(k, v)| (k.clone(), to_sdk(v)))
        .collect()
}

fn from_sdk_item(item: &SdkItem) -> StoreResult<Item> {
    item.iter()
        .map(|(k, v)| from_sdk(v).map(|v| (k.clone(), v)))
        .collect()
}

fn key_map(key: &Key) -> SdkItem {
    to_sdk_item(&key.to_item())
}

fn classify<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match err.code() {
        Some("ConditionalCheckFailedException") => StoreError::ConditionFailed,
        Some("ValidationException") => {
            StoreError::InvalidInput(err.message().unwrap_or("validation failed").to_string())
        }
        _ => StoreError::Unavailable(DisplayErrorContext(&err).to_string()),
    }
}

fn build_err(err: BuildError) -> StoreError {
    StoreError::InvalidInput(err.to_string())
}

/// Placeholder bookkeeping for condition, update and filter expressions.
#[derive(Default)]
struct Expr {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Expr {
    fn name(&mut self, attr: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, a)| a.as_str() == attr) {
            return placeholder.clone();
        }
        let placeholder = format!("#a{}", self.names.len());
        self.names.insert(placeholder.clone(), attr.to_string());
        placeholder
    }

    fn value(&mut self, value: AttributeValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Exists => format!("attribute_exists({})", self.name(PK)),
            Condition::NotExists => format!("attribute_not_exists({})", self.name(PK)),
            Condition::GreaterThan(attr, bound) => {
                let name = self.name(attr);
                let value = self.value(AttributeValue::N(bound.to_string()));
                format!("{} > {}", name, value)
            }
            Condition::And(all) => all
                .iter()
                .map(|c| format!("({})", self.condition(c)))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }

    fn update(&mut self, update: &Update) -> String {
        let mut clauses = Vec::new();
        if !update.add.is_empty() {
            let parts: Vec<String> = update
                .add
                .iter()
                .map(|(attr, delta)| {
                    let name = self.name(attr);
                    let value = self.value(AttributeValue::N(delta.to_string()));
                    format!("{} {}", name, value)
                })
                .collect();
            clauses.push(format!("ADD {}", parts.join(", ")));
        }
        if !update.set.is_empty() {
            let parts: Vec<String> = update
                .set
                .iter()
                .map(|(attr, v)| {
                    let name = self.name(attr);
                    let value = self.value(to_sdk(v));
                    format!("{} = {}", name, value)
                })
                .collect();
            clauses.push(format!("SET {}", parts.join(", ")));
        }
        clauses.join(" ")
    }

    fn filters(&mut self, filters: &[Filter]) -> Option<String> {
        if filters.is_empty() {
            return None;
        }
        let parts: Vec<String> = filters
            .iter()
            .map(|f| {
                let (attr, op, value) = match f {
                    Filter::Eq(attr, value) => (attr, "=", value),
                    Filter::Ge(attr, value) => (attr, ">=", value),
                };
                let name = self.name(attr);
                let value = self.value(to_sdk(value));
                format!("{} {} {}", name, op, value)
            })
            .collect();
        Some(parts.join(" AND "))
    }

    fn names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    fn values(&self) -> Option<HashMap<String, AttributeValue>> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

fn transact_item(op: &WriteOp) -> StoreResult<TransactWriteItem> {
    let mut expr = Expr::default();
    let item = match op {
        WriteOp::Put {
            table,
            item,
            condition,
        } => {
            let condition = condition.as_ref().map(|c| expr.condition(c));
            let put = Put::builder()
                .table_name(table)
                .set_item(Some(to_sdk_item(item)))
                .set_condition_expression(condition)
                .set_expression_attribute_names(expr.names())
                .set_expression_attribute_values(expr.values())
                .build()
                .map_err(build_err)?;
            TransactWriteItem::builder().put(put).build()
        }
        WriteOp::Delete {
            table,
            key,
            condition,
        } => {
            let condition = condition.as_ref().map(|c| expr.condition(c));
            let delete = Delete::builder()
                .table_name(table)
                .set_key(Some(key_map(key)))
                .set_condition_expression(condition)
                .set_expression_attribute_names(expr.names())
                .set_expression_attribute_values(expr.values())
                .build()
                .map_err(build_err)?;
            TransactWriteItem::builder().delete(delete).build()
        }
        WriteOp::Update {
            table,
            key,
            update,
            condition,
        } => {
            let update_expr = expr.update(update);
            let condition = condition.as_ref().map(|c| expr.condition(c));
            let action = UpdateAction::builder()
                .table_name(table)
                .set_key(Some(key_map(key)))
                .update_expression(update_expr)
                .set_condition_expression(condition)
                .set_expression_attribute_names(expr.names())
                .set_expression_attribute_values(expr.values())
                .build()
                .map_err(build_err)?;
            TransactWriteItem::builder().update(action).build()
        }
    };
    Ok(item)
}

#[async_trait]
impl WideColumnStore for DynamoStore {
    async fn get(&self, table: &str, key: &Key) -> StoreResult<Option<Item>> {
        let out = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key_map(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(classify)?;
        out.item().map(from_sdk_item).transpose()
    }

    async fn put(&self, table: &str, item: Item, condition: Option<Condition>) -> StoreResult<()> {
        let mut expr = Expr::default();
        let condition = condition.as_ref().map(|c| expr.condition(c));
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_sdk_item(&item)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete(
        &self,
        table: &str,
        key: &Key,
        condition: Option<Condition>,
    ) -> StoreResult<()> {
        let mut expr = Expr::default();
        let condition = condition.as_ref().map(|c| expr.condition(c));
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(key_map(key)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        key: &Key,
        update: Update,
        condition: Option<Condition>,
    ) -> StoreResult<()> {
        if update.is_empty() {
            return Err(StoreError::InvalidInput("empty update".into()));
        }
        let mut expr = Expr::default();
        let update_expr = expr.update(&update);
        let condition = condition.as_ref().map(|c| expr.condition(c));
        self.client
            .update_item()
            .table_name(table)
            .set_key(Some(key_map(key)))
            .update_expression(update_expr)
            .set_condition_expression(condition)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn query(&self, query: Query) -> StoreResult<Page> {
        let (pk_attr, sk_attr) = match &query.index {
            Some(index) => index_key_attrs(index),
            None => (PK.to_string(), SK.to_string()),
        };

        let mut expr = Expr::default();
        let pk_name = expr.name(&pk_attr);
        let pk_value = expr.value(AttributeValue::S(query.partition.clone()));
        let mut key_condition = format!("{} = {}", pk_name, pk_value);
        if let Some(prefix) = &query.sort_prefix {
            let sk_name = expr.name(&sk_attr);
            let sk_value = expr.value(AttributeValue::S(prefix.clone()));
            key_condition.push_str(&format!(" AND begins_with({}, {})", sk_name, sk_value));
        }

        let out = self
            .client
            .query()
            .table_name(&query.table)
            .set_index_name(query.index.clone())
            .key_condition_expression(key_condition)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .scan_index_forward(query.forward)
            .set_limit(query.limit.map(|l| l.min(i32::MAX as usize) as i32))
            .set_exclusive_start_key(query.start.as_ref().map(to_sdk_item))
            .send()
            .await
            .map_err(classify)?;

        Ok(Page {
            items: out
                .items()
                .iter()
                .map(from_sdk_item)
                .collect::<StoreResult<_>>()?,
            last_key: out.last_evaluated_key().map(from_sdk_item).transpose()?,
        })
    }

    async fn scan(&self, scan: Scan) -> StoreResult<Page> {
        let mut expr = Expr::default();
        let filter = expr.filters(&scan.filters);

        let out = self
            .client
            .scan()
            .table_name(&scan.table)
            .set_filter_expression(filter)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .set_limit(scan.limit.map(|l| l.min(i32::MAX as usize) as i32))
            .set_exclusive_start_key(scan.start.as_ref().map(to_sdk_item))
            .send()
            .await
            .map_err(classify)?;

        Ok(Page {
            items: out
                .items()
                .iter()
                .map(from_sdk_item)
                .collect::<StoreResult<_>>()?,
            last_key: out.last_evaluated_key().map(from_sdk_item).transpose()?,
        })
    }

    async fn batch_get(&self, table: &str, keys: Vec<Key>) -> StoreResult<Vec<Item>> {
        check_batch(keys.len(), BATCH_GET_LIMIT, "batch get")?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pending = Some(
            KeysAndAttributes::builder()
                .set_keys(Some(keys.iter().map(key_map).collect()))
                .build()
                .map_err(build_err)?,
        );
        let mut items = Vec::with_capacity(keys.len());
        let mut attempt = 0;

        while let Some(request) = pending.take() {
            let out = self
                .client
                .batch_get_item()
                .request_items(table, request)
                .send()
                .await
                .map_err(classify)?;

            if let Some(rows) = out.responses().and_then(|r| r.get(table)) {
                for row in rows {
                    items.push(from_sdk_item(row)?);
                }
            }

            pending = out
                .unprocessed_keys()
                .and_then(|u| u.get(table))
                .filter(|k| !k.keys().is_empty())
                .cloned();
            if pending.is_some() {
                attempt += 1;
                self.backoff(attempt, "keys").await?;
            }
        }
        Ok(items)
    }

    async fn batch_put(&self, table: &str, items: Vec<Item>) -> StoreResult<()> {
        check_batch(items.len(), BATCH_WRITE_LIMIT, "batch write")?;
        let mut pending = items
            .iter()
            .map(|item| {
                PutRequest::builder()
                    .set_item(Some(to_sdk_item(item)))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
                    .map_err(build_err)
            })
            .collect::<StoreResult<Vec<_>>>()?;
        let mut attempt = 0;

        while !pending.is_empty() {
            let out = self
                .client
                .batch_write_item()
                .request_items(table, std::mem::take(&mut pending))
                .send()
                .await
                .map_err(classify)?;

            pending = out
                .unprocessed_items()
                .and_then(|u| u.get(table))
                .cloned()
                .unwrap_or_default();
            if !pending.is_empty() {
                attempt += 1;
                warn!(table, unprocessed = pending.len(), "Batch write partially throttled");
                self.backoff(attempt, "items").await?;
            }
        }
        Ok(())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        check_batch(ops.len(), TRANSACT_LIMIT, "transaction")?;
        let items = ops.iter().map(transact_item).collect::<StoreResult<Vec<_>>>()?;

        match self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(TransactWriteItemsError::TransactionCanceledException(canceled)) =
                    err.as_service_error()
                {
                    let failed: Vec<usize> = canceled
                        .cancellation_reasons()
                        .iter()
                        .enumerate()
                        .filter(|(_, reason)| reason.code() == Some("ConditionalCheckFailed"))
                        .map(|(i, _)| i)
                        .collect();
                    if !failed.is_empty() {
                        return Err(StoreError::TransactionCanceled { failed });
                    }
                }
                Err(classify(err))
            }
        }
    }
}
