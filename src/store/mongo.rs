//! MongoDB implementation of the snapshot store.
//!
//! Two collections in the configured database:
//!
//! - `videos`: one document per item, `_id = platform_id`, replaced on
//!   every save (upsert);
//! - `snapshots`: one document per processed event, insert only.
//!
//! Read paths are bounded by a per-call timeout. BSON has no unsigned
//! 64-bit integer, so counters are stored as `i64` and saturate at
//! `i64::MAX`; negative values read back as `0`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document, doc};
use mongodb::options::{ClientOptions, FindOptions, ReplaceOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{SnapshotStore, settle_dual_write};
use crate::domain::{
    Author, ContentMeta, EngagementEvent, LEADERBOARD_SIZE, Snapshot, SortBy, Stats, StoreStats,
    TrendingPage, TrendingParams, VideoAggregate,
};
use crate::error::AnalyzerError;

const VIDEOS: &str = "videos";
const SNAPSHOTS: &str = "snapshots";

fn to_bson_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_bson_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Embedded counters, signed for BSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StatsDocument {
    views: i64,
    likes: i64,
    comments: i64,
    shares: i64,
}

impl From<Stats> for StatsDocument {
    fn from(s: Stats) -> Self {
        Self {
            views: to_bson_int(s.views),
            likes: to_bson_int(s.likes),
            comments: to_bson_int(s.comments),
            shares: to_bson_int(s.shares),
        }
    }
}

impl From<StatsDocument> for Stats {
    fn from(d: StatsDocument) -> Self {
        Self {
            views: from_bson_int(d.views),
            likes: from_bson_int(d.likes),
            comments: from_bson_int(d.comments),
            shares: from_bson_int(d.shares),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ContentMetaDocument {
    duration: i64,
    hashtags: Vec<String>,
    music_title: Option<String>,
    is_original_sound: bool,
}

impl From<&ContentMeta> for ContentMetaDocument {
    fn from(m: &ContentMeta) -> Self {
        Self {
            duration: to_bson_int(m.duration),
            hashtags: m.hashtags.clone(),
            music_title: m.music_title.clone(),
            is_original_sound: m.is_original_sound,
        }
    }
}

impl From<ContentMetaDocument> for ContentMeta {
    fn from(d: ContentMetaDocument) -> Self {
        Self {
            duration: from_bson_int(d.duration),
            hashtags: d.hashtags,
            music_title: d.music_title,
            is_original_sound: d.is_original_sound,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AuthorDocument {
    username: String,
    nickname: Option<String>,
    follower_count: Option<i64>,
}

impl From<&Author> for AuthorDocument {
    fn from(a: &Author) -> Self {
        Self {
            username: a.username.clone(),
            nickname: a.nickname.clone(),
            follower_count: a.follower_count.map(to_bson_int),
        }
    }
}

impl From<AuthorDocument> for Author {
    fn from(d: AuthorDocument) -> Self {
        Self {
            username: d.username,
            nickname: d.nickname,
            follower_count: d.follower_count.map(from_bson_int),
        }
    }
}

/// `videos` collection document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VideoDocument {
    #[serde(rename = "_id")]
    platform_id: String,
    source: String,
    description: String,
    published_at: Option<bson::DateTime>,
    url: String,
    stats: StatsDocument,
    content_meta: ContentMetaDocument,
    author: AuthorDocument,
    virality_score: u32,
    engagement_rate: f64,
    last_updated: bson::DateTime,
}

impl From<&VideoAggregate> for VideoDocument {
    fn from(v: &VideoAggregate) -> Self {
        Self {
            platform_id: v.platform_id.clone(),
            source: v.source.clone(),
            description: v.description.clone(),
            published_at: v.published_at.map(bson::DateTime::from_chrono),
            url: v.url.clone(),
            stats: v.stats.into(),
            content_meta: (&v.content_meta).into(),
            author: (&v.author).into(),
            virality_score: v.virality_score,
            engagement_rate: v.engagement_rate,
            last_updated: bson::DateTime::from_chrono(v.last_updated),
        }
    }
}

impl From<VideoDocument> for VideoAggregate {
    fn from(d: VideoDocument) -> Self {
        Self {
            platform_id: d.platform_id,
            source: d.source,
            description: d.description,
            published_at: d.published_at.map(bson::DateTime::to_chrono),
            url: d.url,
            stats: d.stats.into(),
            content_meta: d.content_meta.into(),
            author: d.author.into(),
            virality_score: d.virality_score,
            engagement_rate: d.engagement_rate,
            last_updated: d.last_updated.to_chrono(),
        }
    }
}

/// `snapshots` collection document. `_id` is assigned by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotDocument {
    video_id: String,
    snapshot_time: bson::DateTime,
    stats: StatsDocument,
}

impl From<SnapshotDocument> for Snapshot {
    fn from(d: SnapshotDocument) -> Self {
        Self {
            video_id: d.video_id,
            snapshot_time: d.snapshot_time.to_chrono(),
            stats: d.stats.into(),
        }
    }
}

/// Document-store backend using the official `mongodb` driver.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
    query_timeout: Duration,
}

impl MongoStore {
    /// Connects, pings the deployment, and ensures indexes exist.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] if the URI is invalid, the
    /// server does not answer the ping, or index creation fails.
    pub async fn connect(
        uri: &str,
        database: &str,
        query_timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(AnalyzerError::persistence)?;
        let client = Client::with_options(options).map_err(AnalyzerError::persistence)?;
        let db = client.database(database);

        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(AnalyzerError::persistence)?;

        let store = Self {
            client,
            db,
            query_timeout,
        };
        store.ensure_indexes().await?;
        tracing::info!(database, "connected to mongodb");
        Ok(store)
    }

    fn videos(&self) -> Collection<VideoDocument> {
        self.db.collection(VIDEOS)
    }

    fn snapshots(&self) -> Collection<SnapshotDocument> {
        self.db.collection(SNAPSHOTS)
    }

    async fn ensure_indexes(&self) -> Result<(), AnalyzerError> {
        let video_keys = [
            doc! { "source": 1 },
            doc! { "virality_score": -1 },
            doc! { "stats.views": -1 },
            doc! { "published_at": -1 },
            doc! { "last_updated": -1 },
        ];
        let models: Vec<IndexModel> = video_keys
            .into_iter()
            .map(|keys| IndexModel::builder().keys(keys).build())
            .collect();
        self.videos()
            .create_indexes(models, None)
            .await
            .map_err(AnalyzerError::persistence)?;

        let history = IndexModel::builder()
            .keys(doc! { "video_id": 1, "snapshot_time": 1 })
            .build();
        self.snapshots()
            .create_index(history, None)
            .await
            .map_err(AnalyzerError::persistence)?;
        Ok(())
    }

    /// Runs a read under the per-call timeout.
    async fn timed<T, F>(&self, op: &str, fut: F) -> Result<T, AnalyzerError>
    where
        F: Future<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(AnalyzerError::persistence),
            Err(_) => Err(AnalyzerError::Persistence(format!(
                "{op} timed out after {}s",
                self.query_timeout.as_secs()
            ))),
        }
    }

    async fn find_videos(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<VideoAggregate>, AnalyzerError> {
        let docs: Vec<VideoDocument> = self
            .timed("find videos", async {
                self.videos()
                    .find(filter, options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(docs.into_iter().map(VideoAggregate::from).collect())
    }
}

/// Sort document for a trending ordering, with `_id` as tie-breaker.
fn sort_document(sort_by: SortBy) -> Document {
    match sort_by {
        SortBy::Newest => doc! { "published_at": -1, "_id": 1 },
        SortBy::MostViewed => doc! { "stats.views": -1, "_id": 1 },
        SortBy::Virality => doc! { "virality_score": -1, "_id": 1 },
        SortBy::LastUpdated => doc! { "last_updated": -1, "_id": 1 },
    }
}

/// Filter document for a trending query.
fn platform_filter(params: &TrendingParams) -> Document {
    match &params.platform {
        Some(platform) => doc! { "source": platform.as_str() },
        None => doc! {},
    }
}

#[async_trait]
impl SnapshotStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongo"
    }

    async fn save_snapshot(&self, event: &EngagementEvent) -> Result<(), AnalyzerError> {
        if !event.is_video() {
            return Ok(());
        }
        let now = Utc::now();
        let video = VideoAggregate::from_event(event, now);
        let video_id = video.platform_id.as_str();

        let upsert = self
            .videos()
            .replace_one(
                doc! { "_id": video_id },
                VideoDocument::from(&video),
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await
            .map(|_| ())
            .map_err(|e| AnalyzerError::Persistence(format!("upsert into {VIDEOS}: {e}")));

        let snapshot = SnapshotDocument {
            video_id: video_id.to_string(),
            snapshot_time: bson::DateTime::from_chrono(now),
            stats: video.stats.into(),
        };
        let append = self
            .snapshots()
            .insert_one(snapshot, None)
            .await
            .map(|_| ())
            .map_err(|e| AnalyzerError::Persistence(format!("insert into {SNAPSHOTS}: {e}")));

        settle_dual_write(video_id, upsert, append)?;
        tracing::info!(video_id, virality = video.virality_score, "video updated");
        Ok(())
    }

    async fn get_trending_videos(
        &self,
        params: &TrendingParams,
    ) -> Result<TrendingPage, AnalyzerError> {
        let filter = platform_filter(params);
        let total = self
            .timed(
                "count videos",
                self.videos().count_documents(filter.clone(), None),
            )
            .await?;

        // A zero limit means "unbounded" to the server.
        if params.limit == 0 {
            return Ok(TrendingPage {
                items: Vec::new(),
                total,
            });
        }

        let options = FindOptions::builder()
            .sort(sort_document(params.sort_by))
            .skip(params.offset())
            .limit(i64::try_from(params.limit).unwrap_or(i64::MAX))
            .build();
        let items = self.find_videos(filter, options).await?;
        Ok(TrendingPage { items, total })
    }

    async fn get_leaderboard(&self) -> Result<Vec<VideoAggregate>, AnalyzerError> {
        let options = FindOptions::builder()
            .sort(sort_document(SortBy::Virality))
            .limit(i64::try_from(LEADERBOARD_SIZE).unwrap_or(i64::MAX))
            .build();
        self.find_videos(doc! {}, options).await
    }

    async fn get_video_trajectory(&self, video_id: &str) -> Result<Vec<Snapshot>, AnalyzerError> {
        let options = FindOptions::builder()
            .sort(doc! { "snapshot_time": 1, "_id": 1 })
            .build();
        let docs: Vec<SnapshotDocument> = self
            .timed("find snapshots", async {
                self.snapshots()
                    .find(doc! { "video_id": video_id }, options)
                    .await?
                    .try_collect()
                    .await
            })
            .await?;
        Ok(docs.into_iter().map(Snapshot::from).collect())
    }

    async fn get_stats(&self) -> Result<StoreStats, AnalyzerError> {
        let total = self
            .timed(
                "estimate video count",
                self.videos().estimated_document_count(None),
            )
            .await?;
        Ok(StoreStats::nominal(total))
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        tracing::info!("mongodb client shut down");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Payload;

    #[test]
    fn sort_documents_use_descending_keys() {
        assert_eq!(
            sort_document(SortBy::Virality),
            doc! { "virality_score": -1, "_id": 1 }
        );
        assert_eq!(
            sort_document(SortBy::MostViewed),
            doc! { "stats.views": -1, "_id": 1 }
        );
        assert_eq!(
            sort_document(SortBy::Newest),
            doc! { "published_at": -1, "_id": 1 }
        );
        assert_eq!(
            sort_document(SortBy::LastUpdated),
            doc! { "last_updated": -1, "_id": 1 }
        );
    }

    #[test]
    fn empty_platform_matches_everything() {
        let mut params = TrendingParams {
            sort_by: SortBy::Newest,
            platform: None,
            page: 1,
            limit: 20,
        };
        assert_eq!(platform_filter(&params), doc! {});
        params.platform = Some("tiktok".to_string());
        assert_eq!(platform_filter(&params), doc! { "source": "tiktok" });
    }

    #[test]
    fn document_round_trip_preserves_aggregate() {
        let event = EngagementEvent {
            source: "tiktok".to_string(),
            event_time: None,
            data_type: "video".to_string(),
            payload: Payload {
                platform_id: "v1".to_string(),
                published_at: Some(Utc::now()),
                stats: Stats {
                    views: 1000,
                    likes: 100,
                    comments: 10,
                    shares: 5,
                },
                ..Payload::default()
            },
        };
        let video = VideoAggregate::from_event(&event, Utc::now());
        let doc = VideoDocument::from(&video);
        assert_eq!(doc.platform_id, "v1");

        let back = VideoAggregate::from(doc);
        assert_eq!(back.platform_id, video.platform_id);
        assert_eq!(back.stats, video.stats);
        assert_eq!(back.virality_score, 26);
        // BSON dates carry millisecond precision.
        assert_eq!(
            back.last_updated.timestamp_millis(),
            video.last_updated.timestamp_millis()
        );
    }

    #[test]
    fn oversized_counters_saturate_in_bson() {
        let event = EngagementEvent {
            source: "tiktok".to_string(),
            event_time: None,
            data_type: "video".to_string(),
            payload: Payload {
                platform_id: "huge".to_string(),
                stats: Stats {
                    views: u64::MAX,
                    likes: u64::MAX,
                    comments: 1,
                    shares: 0,
                },
                content_meta: ContentMeta {
                    duration: u64::MAX,
                    ..ContentMeta::default()
                },
                author: Author {
                    follower_count: Some(u64::MAX),
                    ..Author::default()
                },
                ..Payload::default()
            },
        };
        let video = VideoAggregate::from_event(&event, Utc::now());

        let Ok(document) = bson::to_document(&VideoDocument::from(&video)) else {
            panic!("aggregate with u64::MAX counters must serialize");
        };
        let Ok(stats) = document.get_document("stats") else {
            panic!("stats sub-document missing");
        };
        assert_eq!(stats.get_i64("views"), Ok(i64::MAX));
        assert_eq!(stats.get_i64("comments"), Ok(1));
        let Ok(meta) = document.get_document("content_meta") else {
            panic!("content_meta sub-document missing");
        };
        assert_eq!(meta.get_i64("duration"), Ok(i64::MAX));

        let snapshot = SnapshotDocument {
            video_id: "huge".to_string(),
            snapshot_time: bson::DateTime::now(),
            stats: video.stats.into(),
        };
        let Ok(_) = bson::to_document(&snapshot) else {
            panic!("snapshot with u64::MAX counters must serialize");
        };
    }

    #[test]
    fn negative_counters_read_back_as_zero() {
        let stats = Stats::from(StatsDocument {
            views: -5,
            likes: 7,
            comments: 0,
            shares: i64::MAX,
        });
        assert_eq!(stats.views, 0);
        assert_eq!(stats.likes, 7);
        assert_eq!(stats.shares, 9_223_372_036_854_775_807);
    }
}
