//! Service layer for feed-service
//!
//! - fanout: materialize new posts into follower feeds
//! - feed_assembly: build a home-feed page from follow feed, trending and post data
//! - posts: post, like and comment operations
//! - trending: periodic trending generation and reads

pub mod fanout;
pub mod feed_assembly;
pub mod posts;
pub mod trending;

pub use fanout::{FanoutEngine, FanoutReport};
pub use feed_assembly::{FeedAssemblyConfig, FeedAssemblyService};
pub use posts::PostService;
pub use trending::{RunOutcome, RunState, TrendingRecommender};
