pub mod scoring;
pub mod service;

pub use scoring::{rank, score, ScoreWeights, ScoredPost};
pub use service::{RunOutcome, RunState, TrendingRecommender};
