//! Token blacklist for logout
//!
//! Tokens are issued and verified upstream; this service only remembers the
//! ones revoked through logout until they would have expired anyway. Entries
//! leave the cache by TTL only: a size bound would let eviction re-admit a
//! revoked token before it expires.

use moka::future::Cache;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct TokenBlacklist {
    revoked: Cache<String, ()>,
}

impl TokenBlacklist {
    pub fn new(ttl: Duration) -> Self {
        let revoked = Cache::builder().time_to_live(ttl).build();
        Self { revoked }
    }

    pub async fn revoke(&self, token: &str) {
        self.revoked.insert(token.to_string(), ()).await;
        info!("Token added to blacklist");
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.revoked.contains_key(token)
    }
}

/// Strip the `Bearer ` scheme from an Authorization header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
