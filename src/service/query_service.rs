//! Query service behind the dashboard endpoints.

use std::sync::Arc;

use crate::domain::{
    Snapshot, SortBy, StoreStats, TrendingPage, TrendingParams, VideoAggregate,
};
use crate::error::AnalyzerError;
use crate::store::SnapshotStore;

/// Page used when none is requested.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when none is requested.
pub const DEFAULT_LIMIT: u64 = 20;

/// Ordering used when `sort_by` is absent.
pub const DEFAULT_SORT: SortBy = SortBy::Newest;

/// Raw trending query as received from a client. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendingRequest {
    /// `newest`, `most_viewed`, `virality`; anything else sorts by last update.
    pub sort_by: Option<String>,
    /// Exact-match source filter. Empty means no filter.
    pub platform: Option<String>,
    /// 1-indexed page.
    pub page: Option<i64>,
    /// Page size.
    pub limit: Option<i64>,
}

impl TrendingRequest {
    /// Resolves defaults and validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::InvalidRequest`] if `page` or `limit` is
    /// below 1.
    pub fn resolve(&self) -> Result<TrendingParams, AnalyzerError> {
        let page = positive("page", self.page, DEFAULT_PAGE)?;
        let limit = positive("limit", self.limit, DEFAULT_LIMIT)?;
        let sort_by = self.sort_by.as_deref().map_or(DEFAULT_SORT, SortBy::parse);
        let platform = self
            .platform
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Ok(TrendingParams {
            sort_by,
            platform,
            page,
            limit,
        })
    }
}

fn positive(name: &str, value: Option<i64>, default: u64) -> Result<u64, AnalyzerError> {
    match value {
        None => Ok(default),
        Some(v) if v >= 1 => u64::try_from(v)
            .map_err(|_| AnalyzerError::InvalidRequest(format!("{name} out of range"))),
        Some(v) => Err(AnalyzerError::InvalidRequest(format!(
            "{name} must be at least 1, got {v}"
        ))),
    }
}

/// Read-side facade used by the HTTP handlers.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<dyn SnapshotStore>,
}

impl QueryService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Returns a page of trending items together with the resolved
    /// parameters, so callers can echo them back.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::InvalidRequest`] for bad pagination and
    /// [`AnalyzerError::Persistence`] on store failure.
    pub async fn trending(
        &self,
        request: &TrendingRequest,
    ) -> Result<(TrendingParams, TrendingPage), AnalyzerError> {
        let params = request.resolve()?;
        tracing::debug!(
            sort_by = %params.sort_by,
            platform = params.platform.as_deref().unwrap_or(""),
            page = params.page,
            limit = params.limit,
            "trending query"
        );
        let page = self.store.get_trending_videos(&params).await?;
        Ok((params, page))
    }

    /// Returns the top items by virality score.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] on store failure.
    pub async fn leaderboard(&self) -> Result<Vec<VideoAggregate>, AnalyzerError> {
        self.store.get_leaderboard().await
    }

    /// Returns the snapshot history of one item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::InvalidRequest`] for a blank id and
    /// [`AnalyzerError::Persistence`] on store failure.
    pub async fn trajectory(&self, video_id: &str) -> Result<Vec<Snapshot>, AnalyzerError> {
        if video_id.trim().is_empty() {
            return Err(AnalyzerError::InvalidRequest(
                "video id is required".to_string(),
            ));
        }
        self.store.get_video_trajectory(video_id).await
    }

    /// Returns summary counters.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] on store failure.
    pub async fn stats(&self) -> Result<StoreStats, AnalyzerError> {
        self.store.get_stats().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::Stats;
    use crate::store::MemoryStore;

    fn video(id: &str, source: &str, score: u32) -> VideoAggregate {
        VideoAggregate {
            platform_id: id.to_string(),
            source: source.to_string(),
            description: String::new(),
            published_at: None,
            url: String::new(),
            stats: Stats::default(),
            content_meta: Default::default(),
            author: Default::default(),
            virality_score: score,
            engagement_rate: 0.0,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn empty_request_uses_defaults() {
        let Ok(params) = TrendingRequest::default().resolve() else {
            panic!("defaults must resolve");
        };
        assert_eq!(params.sort_by, SortBy::Newest);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 20);
        assert_eq!(params.platform, None);
    }

    #[test]
    fn blank_platform_means_no_filter() {
        let request = TrendingRequest {
            platform: Some(String::new()),
            sort_by: Some("bogus".to_string()),
            ..TrendingRequest::default()
        };
        let Ok(params) = request.resolve() else {
            panic!("request must resolve");
        };
        assert_eq!(params.platform, None);
        assert_eq!(params.sort_by, SortBy::LastUpdated);
    }

    #[test]
    fn non_positive_pagination_is_rejected() {
        for request in [
            TrendingRequest {
                page: Some(0),
                ..TrendingRequest::default()
            },
            TrendingRequest {
                limit: Some(-5),
                ..TrendingRequest::default()
            },
        ] {
            assert!(matches!(
                request.resolve(),
                Err(AnalyzerError::InvalidRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn trending_delegates_to_store() {
        let store = Arc::new(MemoryStore::new());
        for (id, score) in [("a", 40), ("b", 80), ("c", 60)] {
            store.put_video(video(id, "tiktok", score)).await;
        }
        let service = QueryService::new(store);

        let request = TrendingRequest {
            sort_by: Some("virality".to_string()),
            page: Some(1),
            limit: Some(2),
            ..TrendingRequest::default()
        };
        let Ok((params, page)) = service.trending(&request).await else {
            panic!("query failed");
        };
        assert_eq!(params.limit, 2);
        assert_eq!(page.total, 3);
        let scores: Vec<u32> = page.items.iter().map(|v| v.virality_score).collect();
        assert_eq!(scores, [80, 60]);
    }

    #[tokio::test]
    async fn blank_trajectory_id_is_rejected() {
        let service = QueryService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.trajectory("  ").await,
            Err(AnalyzerError::InvalidRequest(_))
        ));
        let Ok(history) = service.trajectory("unknown").await else {
            panic!("unknown id must not fail");
        };
        assert!(history.is_empty());
    }
}
