//! Attribute values and items
//!
//! `AttrValue` mirrors the DynamoDB wire representation (`{"S": "..."}`,
//! `{"N": "42"}`) so that serialized keys are portable between backends.
//! Numbers travel as strings; every numeric read goes through a strict decode
//! step instead of silently falling back to a default.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{StoreError, StoreResult};

/// Partition key attribute name.
pub const PK: &str = "PK";
/// Sort key attribute name.
pub const SK: &str = "SK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    S(String),
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    L(Vec<AttrValue>),
    M(HashMap<String, AttrValue>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
}

pub type Item = HashMap<String, AttrValue>;

/// Result of decoding a numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }
}

fn parse_numeric(raw: &str) -> Option<Numeric> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Numeric::Int(i));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Numeric::Float)
}

impl AttrValue {
    pub fn s(value: impl Into<String>) -> Self {
        AttrValue::S(value.into())
    }

    pub fn n(value: impl ToString) -> Self {
        AttrValue::N(value.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// Decode a number that may be stored either as `N` or as a numeric `S`.
    ///
    /// Anything else (booleans, non-numeric strings, NaN) is rejected.
    pub fn numeric(&self) -> StoreResult<Numeric> {
        let raw = match self {
            AttrValue::N(n) => n,
            AttrValue::S(s) => s,
            other => {
                return Err(StoreError::Decode(format!(
                    "expected number, found {}",
                    other.type_name()
                )))
            }
        };
        parse_numeric(raw).ok_or_else(|| StoreError::Decode(format!("not a number: {:?}", raw)))
    }

    pub fn as_i64(&self) -> StoreResult<i64> {
        match self.numeric()? {
            Numeric::Int(i) => Ok(i),
            Numeric::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            Numeric::Float(f) => Err(StoreError::Decode(format!("not an integer: {}", f))),
        }
    }

    pub fn as_f64(&self) -> StoreResult<f64> {
        self.numeric().map(Numeric::as_f64)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::S(_) => "S",
            AttrValue::N(_) => "N",
            AttrValue::Bool(_) => "BOOL",
            AttrValue::Null(_) => "NULL",
            AttrValue::L(_) => "L",
            AttrValue::M(_) => "M",
            AttrValue::Ss(_) => "SS",
        }
    }

    /// Ordering used by range conditions: numbers numerically, strings lexically.
    pub(crate) fn compare(&self, other: &AttrValue) -> Option<Ordering> {
        match (self, other) {
            (AttrValue::S(a), AttrValue::S(b)) => Some(a.cmp(b)),
            (AttrValue::N(_), AttrValue::N(_)) => {
                let a = self.as_f64().ok()?;
                let b = other.as_f64().ok()?;
                a.partial_cmp(&b)
            }
            _ => None,
        }
    }
}

/// Primary key of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub pk: String,
    pub sk: String,
}

impl Key {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    pub fn from_item(item: &Item) -> StoreResult<Self> {
        Ok(Self {
            pk: item.req_s(PK)?,
            sk: item.req_s(SK)?,
        })
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::with_capacity(2);
        item.insert(PK.to_string(), AttrValue::S(self.pk.clone()));
        item.insert(SK.to_string(), AttrValue::S(self.sk.clone()));
        item
    }
}

/// Partition/sort attribute names of a global secondary index.
pub fn index_key_attrs(index: &str) -> (String, String) {
    (format!("{}PK", index), format!("{}SK", index))
}

/// Typed accessors used by repositories when decoding items.
pub trait ItemExt {
    fn req_s(&self, name: &str) -> StoreResult<String>;
    fn opt_s(&self, name: &str) -> StoreResult<Option<String>>;
    fn req_i64(&self, name: &str) -> StoreResult<i64>;
    fn opt_i64(&self, name: &str) -> StoreResult<Option<i64>>;
    fn req_f64(&self, name: &str) -> StoreResult<f64>;
    fn string_set(&self, name: &str) -> StoreResult<Vec<String>>;
}

impl ItemExt for Item {
    fn req_s(&self, name: &str) -> StoreResult<String> {
        self.opt_s(name)?
            .ok_or_else(|| StoreError::Decode(format!("missing attribute {}", name)))
    }

    fn opt_s(&self, name: &str) -> StoreResult<Option<String>> {
        match self.get(name) {
            None | Some(AttrValue::Null(_)) => Ok(None),
            Some(AttrValue::S(s)) => Ok(Some(s.clone())),
            Some(other) => Err(StoreError::Decode(format!(
                "attribute {} has type {}, expected S",
                name,
                other.type_name()
            ))),
        }
    }

    fn req_i64(&self, name: &str) -> StoreResult<i64> {
        self.opt_i64(name)?
            .ok_or_else(|| StoreError::Decode(format!("missing attribute {}", name)))
    }

    fn opt_i64(&self, name: &str) -> StoreResult<Option<i64>> {
        match self.get(name) {
            None | Some(AttrValue::Null(_)) => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .map_err(|e| StoreError::Decode(format!("attribute {}: {}", name, e))),
        }
    }

    fn req_f64(&self, name: &str) -> StoreResult<f64> {
        match self.get(name) {
            Some(value) => value
                .as_f64()
                .map_err(|e| StoreError::Decode(format!("attribute {}: {}", name, e))),
            None => Err(StoreError::Decode(format!("missing attribute {}", name))),
        }
    }

    fn string_set(&self, name: &str) -> StoreResult<Vec<String>> {
        match self.get(name) {
            None | Some(AttrValue::Null(_)) => Ok(Vec::new()),
            Some(AttrValue::Ss(values)) => Ok(values.clone()),
            Some(AttrValue::L(values)) => values
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        StoreError::Decode(format!("attribute {} contains a non-string", name))
                    })
                })
                .collect(),
            Some(other) => Err(StoreError::Decode(format!(
                "attribute {} has type {}, expected SS",
                name,
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_accepts_number_and_numeric_string() {
        assert_eq!(AttrValue::n(42).as_i64().unwrap(), 42);
        assert_eq!(AttrValue::s("1700000000").as_i64().unwrap(), 1_700_000_000);
        assert_eq!(AttrValue::s(" 7 ").as_i64().unwrap(), 7);
        assert_eq!(AttrValue::n("12.50").as_f64().unwrap(), 12.5);
    }

    #[test]
    fn numeric_rejects_garbage() {
        assert!(AttrValue::s("soon").as_i64().is_err());
        assert!(AttrValue::s("NaN").as_f64().is_err());
        assert!(AttrValue::Bool(true).as_i64().is_err());
        assert!(AttrValue::n("1.5").as_i64().is_err());
    }

    #[test]
    fn serializes_like_dynamodb_json() {
        let json = serde_json::to_string(&AttrValue::s("USER#1")).unwrap();
        assert_eq!(json, r#"{"S":"USER#1"}"#);
        let json = serde_json::to_string(&AttrValue::Bool(true)).unwrap();
        assert_eq!(json, r#"{"BOOL":true}"#);
    }

    #[test]
    fn item_accessors_report_missing_and_mistyped_attributes() {
        let mut item = Item::new();
        item.insert("content".into(), AttrValue::s("hi"));
        item.insert("like_count".into(), AttrValue::s("oops"));

        assert_eq!(item.req_s("content").unwrap(), "hi");
        assert!(item.req_s("author_id").is_err());
        assert!(item.req_i64("like_count").is_err());
        assert!(item.opt_s("like_count").unwrap().is_some());
        assert!(item.string_set("tags").unwrap().is_empty());
    }

    #[test]
    fn numbers_compare_numerically() {
        let a = AttrValue::n("9");
        let b = AttrValue::n("10");
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(AttrValue::s("9").compare(&AttrValue::s("10")), Some(Ordering::Greater));
        assert_eq!(a.compare(&AttrValue::s("9")), None);
    }
}
