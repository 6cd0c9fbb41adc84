/// Engagement scoring for trending generation
use std::cmp::Ordering;

use crate::models::Post;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub like: f64,
    pub comment: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            like: 1.0,
            comment: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPost {
    pub post_id: String,
    pub score: f64,
}

/// `likes * like_weight + comments * comment_weight`, never below zero and
/// rounded to the two decimals the persisted sort key keeps.
pub fn score(post: &Post, weights: ScoreWeights) -> f64 {
    let raw = post.like_count as f64 * weights.like + post.comment_count as f64 * weights.comment;
    if raw.is_finite() {
        (raw.max(0.0) * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// Highest score first; equal scores fall back to post id, descending, which
/// is the order a descending read of the persisted sort keys returns.
pub fn compare(a: &ScoredPost, b: &ScoredPost) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.post_id.cmp(&a.post_id))
}

/// Score, order and truncate to the top `top_n` posts.
pub fn rank(posts: &[Post], weights: ScoreWeights, top_n: usize) -> Vec<ScoredPost> {
    let mut scored: Vec<ScoredPost> = posts
        .iter()
        .map(|post| ScoredPost {
            post_id: post.post_id.clone(),
            score: score(post, weights),
        })
        .collect();
    scored.sort_by(compare);
    scored.truncate(top_n);
    scored
}
