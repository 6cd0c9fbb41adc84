//! Background jobs for feed-service

pub mod fanout_queue;
pub mod trending_refresh;

pub use fanout_queue::{create_fanout_queue, spawn_fanout_worker, FanoutJob, FanoutQueue};
pub use trending_refresh::TrendingRefreshJob;
