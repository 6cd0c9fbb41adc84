/// Configuration management for Feed Service
///
/// Loads configuration from environment variables (after `.env`, if present).
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub feed: FeedConfig,
    pub trending: TrendingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    /// Upper bound for one feed request, in milliseconds
    pub request_timeout_ms: u64,
    /// Grace period for draining background work on shutdown, in seconds
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Dynamodb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(StoreBackend::Dynamodb),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND '{}' (expected dynamodb or memory)", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub region: Option<String>,
    /// Endpoint override for DynamoDB Local
    pub endpoint_url: Option<String>,
    pub posts_table: String,
    pub feed_table: String,
    pub recommendations_table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Page size when the client does not ask for one
    pub default_limit: usize,
    /// Follow-feed entries below which trending backfill kicks in
    pub backfill_threshold: usize,
    /// Trending items fetched per backfill
    pub backfill_overfetch: usize,
    pub entry_ttl_days: i64,
    pub fanout_chunk_size: usize,
    pub fanout_queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingConfig {
    pub enabled: bool,
    pub like_weight: f64,
    pub comment_weight: f64,
    pub lookback_days: i64,
    pub top_n: usize,
    pub interval_secs: u64,
    pub algorithm_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Longest a revoked token is remembered; tokens expire on their own after this
    pub blacklist_ttl_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            backfill_threshold: 10,
            backfill_overfetch: 50,
            entry_ttl_days: 90,
            fanout_chunk_size: 25,
            fanout_queue_capacity: 1024,
        }
    }
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            like_weight: 1.0,
            comment_weight: 0.0,
            lookback_days: 7,
            top_n: 100,
            interval_secs: 3600,
            algorithm_version: "trending-v1.0".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            blacklist_ttl_secs: 24 * 3600,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl TrendingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value for {}", name)),
        Err(_) => Ok(default),
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let feed_defaults = FeedConfig::default();
        let trending_defaults = TrendingConfig::default();
        let auth_defaults = AuthConfig::default();

        let app = AppConfig {
            env: env_string("APP_ENV", "development"),
            host: env_string("APP_HOST", "0.0.0.0"),
            port: env_or("APP_PORT", 8080)?,
            request_timeout_ms: env_or("FEED_REQUEST_TIMEOUT_MS", 5_000)?,
            shutdown_grace_secs: env_or("SHUTDOWN_GRACE_SECS", 10)?,
        };

        let backend = env_or("STORE_BACKEND", StoreBackend::Dynamodb)?;
        let store = StoreConfig {
            backend,
            region: std::env::var("AWS_REGION").ok(),
            endpoint_url: std::env::var("DYNAMODB_ENDPOINT").ok(),
            posts_table: env_string("POSTS_TABLE", "Posts"),
            feed_table: env_string("USER_FEED_TABLE", "UserFeed"),
            recommendations_table: env_string("RECOMMENDATIONS_TABLE", "UserRecommendations"),
        };

        let identity = IdentityConfig {
            base_url: match (std::env::var("IDENTITY_SERVICE_URL"), backend) {
                (Ok(url), _) => url,
                (Err(_), StoreBackend::Memory) => "http://127.0.0.1:8081".to_string(),
                (Err(_), StoreBackend::Dynamodb) => {
                    return Err(anyhow::anyhow!("IDENTITY_SERVICE_URL environment variable not set"))
                }
            },
            timeout_ms: env_or("IDENTITY_SERVICE_TIMEOUT_MS", 2_000)?,
        };

        let feed = FeedConfig {
            default_limit: env_or("FEED_DEFAULT_LIMIT", feed_defaults.default_limit)?,
            backfill_threshold: env_or("FEED_BACKFILL_THRESHOLD", feed_defaults.backfill_threshold)?,
            backfill_overfetch: env_or("FEED_BACKFILL_OVERFETCH", feed_defaults.backfill_overfetch)?,
            entry_ttl_days: env_or("FEED_ENTRY_TTL_DAYS", feed_defaults.entry_ttl_days)?,
            fanout_chunk_size: env_or("FANOUT_CHUNK_SIZE", feed_defaults.fanout_chunk_size)?,
            fanout_queue_capacity: env_or(
                "FANOUT_QUEUE_CAPACITY",
                feed_defaults.fanout_queue_capacity,
            )?,
        };

        let trending = TrendingConfig {
            enabled: env_or("TRENDING_ENABLED", trending_defaults.enabled)?,
            like_weight: env_or("TRENDING_LIKE_WEIGHT", trending_defaults.like_weight)?,
            comment_weight: env_or("TRENDING_COMMENT_WEIGHT", trending_defaults.comment_weight)?,
            lookback_days: env_or("TRENDING_LOOKBACK_DAYS", trending_defaults.lookback_days)?,
            top_n: env_or("TRENDING_TOP_N", trending_defaults.top_n)?,
            interval_secs: env_or("TRENDING_INTERVAL_SECS", trending_defaults.interval_secs)?,
            algorithm_version: env_string(
                "TRENDING_ALGORITHM_VERSION",
                &trending_defaults.algorithm_version,
            ),
        };

        let auth = AuthConfig {
            blacklist_ttl_secs: env_or("TOKEN_BLACKLIST_TTL_SECS", auth_defaults.blacklist_ttl_secs)?,
        };

        let config = Config {
            app,
            store,
            identity,
            feed,
            trending,
            auth,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let feed = &self.feed;
        if feed.default_limit == 0 || feed.default_limit > 100 {
            bail!("FEED_DEFAULT_LIMIT must be between 1 and 100");
        }
        if feed.backfill_threshold > 100 {
            bail!("FEED_BACKFILL_THRESHOLD must not exceed 100");
        }
        if feed.fanout_chunk_size == 0 || feed.fanout_chunk_size > wide_column::BATCH_WRITE_LIMIT {
            bail!(
                "FANOUT_CHUNK_SIZE must be between 1 and {}",
                wide_column::BATCH_WRITE_LIMIT
            );
        }
        if feed.fanout_queue_capacity == 0 {
            bail!("FANOUT_QUEUE_CAPACITY must be positive");
        }
        if feed.entry_ttl_days <= 0 {
            bail!("FEED_ENTRY_TTL_DAYS must be positive");
        }

        let trending = &self.trending;
        if trending.like_weight < 0.0 || trending.comment_weight < 0.0 {
            bail!("trending weights must not be negative");
        }
        if !trending.like_weight.is_finite() || !trending.comment_weight.is_finite() {
            bail!("trending weights must be finite");
        }
        if trending.lookback_days <= 0 {
            bail!("TRENDING_LOOKBACK_DAYS must be positive");
        }
        if trending.top_n == 0 {
            bail!("TRENDING_TOP_N must be positive");
        }
        if trending.interval_secs == 0 {
            bail!("TRENDING_INTERVAL_SECS must be positive");
        }
        if self.app.request_timeout_ms == 0 {
            bail!("FEED_REQUEST_TIMEOUT_MS must be positive");
        }
        Ok(())
    }
}
