//! Persisted views: the per-item aggregate and its snapshot history.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Author, ContentMeta, EngagementEvent, ScoreCard, Stats};

/// Status reported by [`StoreStats`].
pub const NOMINAL_STATUS: &str = "NOMINAL";

/// Number of rows returned by the leaderboard.
pub const LEADERBOARD_SIZE: u64 = 5;

/// Current state of one content item.
///
/// One row per `platform_id`. Every processed event for that id overwrites
/// the row (last write by arrival order wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoAggregate {
    /// Platform-side content identifier (primary key).
    pub platform_id: String,
    /// Platform the item was observed on.
    pub source: String,
    /// Caption / title.
    pub description: String,
    /// Original publish time, when known.
    pub published_at: Option<DateTime<Utc>>,
    /// Canonical URL.
    pub url: String,
    /// Latest observed counters.
    pub stats: Stats,
    /// Platform-specific extras from the latest event.
    pub content_meta: ContentMeta,
    /// Publishing account.
    pub author: Author,
    /// Bounded popularity score in `[0, 100]`.
    pub virality_score: u32,
    /// Interactions per view, percent.
    pub engagement_rate: f64,
    /// Server time of the last upsert.
    pub last_updated: DateTime<Utc>,
}

impl VideoAggregate {
    /// Builds the aggregate row for an event observed at `now`.
    #[must_use]
    pub fn from_event(event: &EngagementEvent, now: DateTime<Utc>) -> Self {
        let payload = &event.payload;
        let score = ScoreCard::compute(&payload.stats);
        Self {
            platform_id: payload.platform_id.clone(),
            source: event.source.clone(),
            description: payload.description.clone(),
            published_at: payload.published_at,
            url: payload.url.clone(),
            stats: payload.stats,
            content_meta: payload.content_meta.clone(),
            author: payload.author.clone(),
            virality_score: score.virality_score,
            engagement_rate: score.engagement_rate,
            last_updated: now,
        }
    }
}

/// One immutable historical observation of an item's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Snapshot {
    /// Correlates to [`VideoAggregate::platform_id`].
    pub video_id: String,
    /// Server time the observation was recorded.
    pub snapshot_time: DateTime<Utc>,
    /// Raw counters as received.
    pub stats: Stats,
}

impl Snapshot {
    /// Builds the history record for an event observed at `now`.
    #[must_use]
    pub fn from_event(event: &EngagementEvent, now: DateTime<Utc>) -> Self {
        Self {
            video_id: event.payload.platform_id.clone(),
            snapshot_time: now,
            stats: event.payload.stats,
        }
    }
}

/// Ordering of a trending query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortBy {
    /// `published_at` descending, unknown publish dates last.
    Newest,
    /// `stats.views` descending.
    MostViewed,
    /// `virality_score` descending.
    Virality,
    /// `last_updated` descending. Used for any unrecognised value.
    #[default]
    LastUpdated,
}

impl SortBy {
    /// Parses a query-string value. Unrecognised values fall back to
    /// [`SortBy::LastUpdated`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "newest" => Self::Newest,
            "most_viewed" => Self::MostViewed,
            "virality" => Self::Virality,
            _ => Self::LastUpdated,
        }
    }

    /// Wire name of the ordering.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::MostViewed => "most_viewed",
            Self::Virality => "virality",
            Self::LastUpdated => "last_updated",
        }
    }

    /// Compares two aggregates in this ordering. Ties fall back to
    /// `platform_id` ascending so pages are stable.
    #[must_use]
    pub fn compare(&self, a: &VideoAggregate, b: &VideoAggregate) -> Ordering {
        let primary = match self {
            // `None < Some(_)`, so reversing puts unknown dates last.
            Self::Newest => b.published_at.cmp(&a.published_at),
            Self::MostViewed => b.stats.views.cmp(&a.stats.views),
            Self::Virality => b.virality_score.cmp(&a.virality_score),
            Self::LastUpdated => b.last_updated.cmp(&a.last_updated),
        };
        primary.then_with(|| a.platform_id.cmp(&b.platform_id))
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a trending query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingParams {
    /// Result ordering.
    pub sort_by: SortBy,
    /// Exact-match filter on [`VideoAggregate::source`]; `None` matches all.
    pub platform: Option<String>,
    /// 1-indexed page number.
    pub page: u64,
    /// Page size. Not capped.
    pub limit: u64,
}

impl TrendingParams {
    /// Number of rows to skip: `(page - 1) * limit`.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Returns `true` when `video` passes the platform filter.
    #[must_use]
    pub fn matches(&self, video: &VideoAggregate) -> bool {
        self.platform
            .as_deref()
            .is_none_or(|platform| video.source == platform)
    }
}

/// One page of a trending query.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingPage {
    /// Rows on the requested page.
    pub items: Vec<VideoAggregate>,
    /// Number of rows matching the filter before pagination.
    pub total: u64,
}

/// Summary counters served by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoreStats {
    /// Number of distinct content items tracked.
    pub total_assets: u64,
    /// Always [`NOMINAL_STATUS`].
    pub status: String,
}

impl StoreStats {
    /// Builds a nominal stats record.
    #[must_use]
    pub fn nominal(total_assets: u64) -> Self {
        Self {
            total_assets,
            status: NOMINAL_STATUS.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Payload;
    use chrono::TimeZone;

    fn event(platform_id: &str, stats: Stats) -> EngagementEvent {
        EngagementEvent {
            source: "tiktok".to_string(),
            event_time: None,
            data_type: "video".to_string(),
            payload: Payload {
                platform_id: platform_id.to_string(),
                stats,
                ..Payload::default()
            },
        }
    }

    fn aggregate(id: &str, views: u64, score: u32) -> VideoAggregate {
        let mut video = VideoAggregate::from_event(
            &event(
                id,
                Stats {
                    views,
                    ..Stats::default()
                },
            ),
            Utc::now(),
        );
        video.virality_score = score;
        video
    }

    #[test]
    fn aggregate_uses_server_time_and_computed_scores() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).single();
        let Some(now) = now else {
            panic!("valid timestamp");
        };
        let stats = Stats {
            views: 1000,
            likes: 100,
            comments: 10,
            shares: 5,
        };
        let mut ev = event("v1", stats);
        ev.event_time = Some(now - chrono::Duration::days(3));

        let video = VideoAggregate::from_event(&ev, now);
        assert_eq!(video.last_updated, now);
        assert_eq!(video.virality_score, 26);
        assert_eq!(video.stats, stats);

        let snap = Snapshot::from_event(&ev, now);
        assert_eq!(snap.video_id, "v1");
        assert_eq!(snap.snapshot_time, now);
    }

    #[test]
    fn sort_by_parses_known_values_and_falls_back() {
        assert_eq!(SortBy::parse("newest"), SortBy::Newest);
        assert_eq!(SortBy::parse("most_viewed"), SortBy::MostViewed);
        assert_eq!(SortBy::parse("virality"), SortBy::Virality);
        assert_eq!(SortBy::parse("hot"), SortBy::LastUpdated);
        assert_eq!(SortBy::parse(""), SortBy::LastUpdated);
    }

    #[test]
    fn virality_ordering_is_descending_with_stable_ties() {
        let mut rows = vec![
            aggregate("b", 0, 40),
            aggregate("c", 0, 80),
            aggregate("a", 0, 40),
        ];
        rows.sort_by(|x, y| SortBy::Virality.compare(x, y));
        let ids: Vec<&str> = rows.iter().map(|v| v.platform_id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn newest_puts_unknown_publish_dates_last() {
        let mut dated = aggregate("dated", 0, 0);
        dated.published_at = Some(Utc::now());
        let undated = aggregate("undated", 0, 0);
        let mut rows = vec![undated, dated];
        rows.sort_by(|x, y| SortBy::Newest.compare(x, y));
        assert_eq!(
            rows.first().map(|v| v.platform_id.as_str()),
            Some("dated")
        );
    }

    #[test]
    fn offset_and_platform_filter() {
        let params = TrendingParams {
            sort_by: SortBy::MostViewed,
            platform: Some("youtube".to_string()),
            page: 3,
            limit: 20,
        };
        assert_eq!(params.offset(), 40);
        assert!(!params.matches(&aggregate("v", 1, 1)));

        let open = TrendingParams {
            platform: None,
            ..params
        };
        assert!(open.matches(&aggregate("v", 1, 1)));
    }
}
