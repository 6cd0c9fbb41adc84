pub mod feed_repo;
pub mod post_repo;
pub mod schema;
pub mod trending_repo;

pub use feed_repo::{FeedRepo, FeedRepository, FeedSlice};
pub use post_repo::{Hydration, PostRepo, PostRepository};
pub use trending_repo::{TrendingRepo, TrendingRepository};
