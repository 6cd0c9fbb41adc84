//! Opaque continuation tokens
//!
//! A token is the store's last-evaluated key serialized as DynamoDB-style JSON
//! and base64-encoded with the URL-safe alphabet. Decoding keeps only the key
//! attributes the caller expects, so tokens carrying extra fields stay valid.

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::{StoreError, StoreResult};
use crate::value::{AttrValue, Item};

pub fn encode(last_key: &Item) -> StoreResult<String> {
    // Sorted so that identical positions always produce identical tokens.
    let ordered: BTreeMap<&String, &AttrValue> = last_key.iter().collect();
    let json = serde_json::to_vec(&ordered)
        .map_err(|e| StoreError::InvalidInput(format!("unserializable key: {}", e)))?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(json))
}

/// Decode a token produced by [`encode`], requiring every attribute in `key_attrs`.
pub fn decode(token: &str, key_attrs: &[&str]) -> StoreResult<Item> {
    let raw = general_purpose::URL_SAFE_NO_PAD
        .decode(token.trim().trim_end_matches('='))
        .map_err(|e| StoreError::InvalidToken(format!("not base64: {}", e)))?;

    let fields: HashMap<String, Value> = serde_json::from_slice(&raw)
        .map_err(|e| StoreError::InvalidToken(format!("not a key map: {}", e)))?;

    let mut key = Item::with_capacity(key_attrs.len());
    for attr in key_attrs {
        let value = fields
            .get(*attr)
            .ok_or_else(|| StoreError::InvalidToken(format!("missing key attribute {}", attr)))?;
        let value: AttrValue = serde_json::from_value(value.clone())
            .map_err(|e| StoreError::InvalidToken(format!("bad value for {}: {}", attr, e)))?;
        key.insert((*attr).to_string(), value);
    }
    Ok(key)
}
