//! Domain layer: wire events, scoring, and the persisted views.
//!
//! This module contains the inbound [`EngagementEvent`] model, the pure
//! [`ScoreCard`] calculator, and the two durable views every store backend
//! maintains: the current-state [`VideoAggregate`] and the append-only
//! [`Snapshot`] history.

pub mod event;
pub mod score;
pub mod video;

pub use event::{Author, ContentMeta, EngagementEvent, Payload, Stats, VIDEO_DATA_TYPE};
pub use score::ScoreCard;
pub use video::{
    LEADERBOARD_SIZE, NOMINAL_STATUS, Snapshot, SortBy, StoreStats, TrendingPage,
    TrendingParams, VideoAggregate,
};
