//! Request types shared by every store backend

use crate::value::{AttrValue, Item, Key, PK};

/// Condition attached to a put, delete or update.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The item must already exist.
    Exists,
    /// The item must not exist yet.
    NotExists,
    /// Numeric attribute strictly greater than a bound.
    GreaterThan(String, i64),
    And(Vec<Condition>),
}

impl Condition {
    pub fn greater_than(attr: impl Into<String>, bound: i64) -> Self {
        Condition::GreaterThan(attr.into(), bound)
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut all) => {
                all.push(other);
                Condition::And(all)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    /// Evaluate against the current version of an item (`None` when absent).
    pub(crate) fn holds(&self, current: Option<&Item>) -> bool {
        match self {
            Condition::Exists => current.map(|i| i.contains_key(PK)).unwrap_or(false),
            Condition::NotExists => current.map(|i| !i.contains_key(PK)).unwrap_or(true),
            Condition::GreaterThan(attr, bound) => current
                .and_then(|i| i.get(attr))
                .and_then(|v| v.as_f64().ok())
                .map(|v| v > *bound as f64)
                .unwrap_or(false),
            Condition::And(all) => all.iter().all(|c| c.holds(current)),
        }
    }
}

/// Atomic attribute modifications: `ADD` for counters, `SET` for plain values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub add: Vec<(String, i64)>,
    pub set: Vec<(String, AttrValue)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, attr: impl Into<String>, delta: i64) -> Self {
        self.add.push((attr.into(), delta));
        self
    }

    pub fn set(mut self, attr: impl Into<String>, value: AttrValue) -> Self {
        self.set.push((attr.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.set.is_empty()
    }
}

/// One operation of a multi-item transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        table: String,
        item: Item,
        condition: Option<Condition>,
    },
    Delete {
        table: String,
        key: Key,
        condition: Option<Condition>,
    },
    Update {
        table: String,
        key: Key,
        update: Update,
        condition: Option<Condition>,
    },
}

impl WriteOp {
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Put { table, .. } | WriteOp::Delete { table, .. } | WriteOp::Update { table, .. } => {
                table
            }
        }
    }
}

/// Range query over one partition of the table or of a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub index: Option<String>,
    pub partition: String,
    pub sort_prefix: Option<String>,
    pub forward: bool,
    pub limit: Option<usize>,
    pub start: Option<Item>,
}

impl Query {
    /// Reverse-order query over `partition`, the common case for timelines.
    pub fn partition(table: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            index: None,
            partition: partition.into(),
            sort_prefix: None,
            forward: false,
            limit: None,
            start: None,
        }
    }

    pub fn on_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn sort_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sort_prefix = Some(prefix.into());
        self
    }

    pub fn forward(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, start: Option<Item>) -> Self {
        self.start = start;
        self
    }
}

/// Filter applied to scanned items.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, AttrValue),
    Ge(String, AttrValue),
}

impl Filter {
    pub(crate) fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::Eq(attr, value) => item.get(attr) == Some(value),
            Filter::Ge(attr, value) => item
                .get(attr)
                .and_then(|v| v.compare(value))
                .map(|o| o.is_ge())
                .unwrap_or(false),
        }
    }
}

/// Full-table scan. `limit` bounds the items evaluated per page, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub table: String,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
    pub start: Option<Item>,
}

impl Scan {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            limit: None,
            start: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn start_after(mut self, start: Option<Item>) -> Self {
        self.start = start;
        self
    }
}

/// One page of query or scan results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    /// Key of the last evaluated item, present when more results may follow.
    pub last_key: Option<Item>,
}
