//! Virality score and engagement rate.
//!
//! Both metrics are pure functions of [`Stats`]. Interaction weights reflect
//! assumed signal strength: a comment counts five likes, a share ten.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Stats;

/// Weight of a comment relative to a like.
pub const COMMENT_WEIGHT: u64 = 5;
/// Weight of a share relative to a like.
pub const SHARE_WEIGHT: u64 = 10;
/// Multiplier applied to `ln(raw + 1)`.
pub const SCORE_SCALE: f64 = 5.0;
/// Upper bound of the virality score.
pub const MAX_VIRALITY_SCORE: u32 = 100;

/// Derived metrics stored alongside each aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoreCard {
    /// Bounded popularity signal in `[0, 100]`.
    pub virality_score: u32,
    /// Interactions per view, as a percentage.
    pub engagement_rate: f64,
}

impl ScoreCard {
    /// Computes both metrics for the given counters.
    #[must_use]
    pub fn compute(stats: &Stats) -> Self {
        Self {
            virality_score: virality_score(stats),
            engagement_rate: engagement_rate(stats),
        }
    }
}

/// `(likes + comments + shares) / views * 100`, or `0` when there are no views.
#[must_use]
pub fn engagement_rate(stats: &Stats) -> f64 {
    if stats.views == 0 {
        return 0.0;
    }
    let interactions = stats
        .likes
        .saturating_add(stats.comments)
        .saturating_add(stats.shares);
    #[allow(clippy::cast_precision_loss)]
    let rate = interactions as f64 / stats.views as f64 * 100.0;
    rate
}

/// Weighted interaction total: `likes + 5*comments + 10*shares`.
///
/// Saturates at `u64::MAX`, far beyond the point where the score clamps.
#[must_use]
pub fn raw_virality(stats: &Stats) -> u64 {
    stats
        .likes
        .saturating_add(stats.comments.saturating_mul(COMMENT_WEIGHT))
        .saturating_add(stats.shares.saturating_mul(SHARE_WEIGHT))
}

/// `floor(ln(raw + 1) * 5)` clamped to `[0, 100]`.
#[must_use]
pub fn virality_score(stats: &Stats) -> u32 {
    #[allow(clippy::cast_precision_loss)]
    let raw = raw_virality(stats) as f64;
    let scaled = ((raw + 1.0).ln() * SCORE_SCALE).floor();
    if scaled <= 0.0 {
        return 0;
    }
    if scaled >= f64::from(MAX_VIRALITY_SCORE) {
        return MAX_VIRALITY_SCORE;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = scaled as u32;
    score
}
