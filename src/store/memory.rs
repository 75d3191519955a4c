//! In-process snapshot store.
//!
//! Keeps aggregates in a `HashMap` keyed by `platform_id` and snapshots in
//! per-item vectors, each behind a [`tokio::sync::RwLock`]. Used by the test
//! suite and by `STORE_BACKEND=memory` for local runs. State is lost on exit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{SnapshotStore, settle_dual_write};
use crate::domain::{
    EngagementEvent, LEADERBOARD_SIZE, Snapshot, SortBy, StoreStats, TrendingPage,
    TrendingParams, VideoAggregate,
};
use crate::error::AnalyzerError;

/// Snapshot store held entirely in memory.
///
/// The aggregate map and the history map are locked independently, which
/// mirrors the non-transactional dual write of the durable backends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    videos: RwLock<HashMap<String, VideoAggregate>>,
    snapshots: RwLock<HashMap<String, Vec<Snapshot>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregate for `platform_id`, if any.
    pub async fn video(&self, platform_id: &str) -> Option<VideoAggregate> {
        self.videos.read().await.get(platform_id).cloned()
    }

    /// Returns the number of aggregate rows.
    pub async fn video_count(&self) -> usize {
        self.videos.read().await.len()
    }

    /// Returns the total number of snapshot records across all items.
    pub async fn snapshot_count(&self) -> usize {
        self.snapshots.read().await.values().map(Vec::len).sum()
    }

    /// Inserts or replaces an aggregate row directly.
    pub async fn put_video(&self, video: VideoAggregate) {
        self.videos
            .write()
            .await
            .insert(video.platform_id.clone(), video);
    }

    async fn upsert(&self, video: VideoAggregate) -> Result<(), AnalyzerError> {
        self.put_video(video).await;
        Ok(())
    }

    async fn append(&self, snapshot: Snapshot) -> Result<(), AnalyzerError> {
        self.snapshots
            .write()
            .await
            .entry(snapshot.video_id.clone())
            .or_default()
            .push(snapshot);
        Ok(())
    }

    async fn sorted(&self, sort_by: SortBy, params: Option<&TrendingParams>) -> Vec<VideoAggregate> {
        let map = self.videos.read().await;
        let mut rows: Vec<VideoAggregate> = map
            .values()
            .filter(|v| params.is_none_or(|p| p.matches(v)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| sort_by.compare(a, b));
        rows
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn save_snapshot(&self, event: &EngagementEvent) -> Result<(), AnalyzerError> {
        if !event.is_video() {
            return Ok(());
        }
        let now = Utc::now();
        let video = VideoAggregate::from_event(event, now);
        let score = video.virality_score;

        let upsert = self.upsert(video).await;
        let append = self.append(Snapshot::from_event(event, now)).await;
        settle_dual_write(&event.payload.platform_id, upsert, append)?;

        tracing::debug!(
            video_id = %event.payload.platform_id,
            virality = score,
            "video updated"
        );
        Ok(())
    }

    async fn get_trending_videos(
        &self,
        params: &TrendingParams,
    ) -> Result<TrendingPage, AnalyzerError> {
        let rows = self.sorted(params.sort_by, Some(params)).await;
        let total = rows.len() as u64;
        let skip = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(params.limit).unwrap_or(usize::MAX);
        let items = rows.into_iter().skip(skip).take(take).collect();
        Ok(TrendingPage { items, total })
    }

    async fn get_leaderboard(&self) -> Result<Vec<VideoAggregate>, AnalyzerError> {
        let rows = self.sorted(SortBy::Virality, None).await;
        let take = usize::try_from(LEADERBOARD_SIZE).unwrap_or(usize::MAX);
        Ok(rows.into_iter().take(take).collect())
    }

    async fn get_video_trajectory(&self, video_id: &str) -> Result<Vec<Snapshot>, AnalyzerError> {
        let map = self.snapshots.read().await;
        let mut history = map.get(video_id).cloned().unwrap_or_default();
        // Already in append order; the stable sort only matters if clocks
        // stepped backwards between appends.
        history.sort_by_key(|s| s.snapshot_time);
        Ok(history)
    }

    async fn get_stats(&self) -> Result<StoreStats, AnalyzerError> {
        Ok(StoreStats::nominal(self.video_count().await as u64))
    }
}
