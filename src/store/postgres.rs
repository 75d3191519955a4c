//! PostgreSQL implementation of the snapshot store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use super::{SnapshotStore, settle_dual_write};
use crate::domain::{
    Author, ContentMeta, EngagementEvent, LEADERBOARD_SIZE, Snapshot, SortBy, Stats, StoreStats,
    TrendingPage, TrendingParams, VideoAggregate,
};
use crate::error::AnalyzerError;

/// Idempotent schema bootstrap, run on every connect.
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS videos (
    platform_id     TEXT PRIMARY KEY,
    source          TEXT NOT NULL,
    description     TEXT NOT NULL,
    published_at    TIMESTAMPTZ,
    url             TEXT NOT NULL,
    views           BIGINT NOT NULL,
    likes           BIGINT NOT NULL,
    comments        BIGINT NOT NULL,
    shares          BIGINT NOT NULL,
    content_meta    JSONB NOT NULL,
    author          JSONB NOT NULL,
    virality_score  INTEGER NOT NULL,
    engagement_rate DOUBLE PRECISION NOT NULL,
    last_updated    TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS videos_source_idx ON videos (source);
CREATE INDEX IF NOT EXISTS videos_virality_idx ON videos (virality_score DESC);
CREATE INDEX IF NOT EXISTS videos_views_idx ON videos (views DESC);
CREATE INDEX IF NOT EXISTS videos_published_idx ON videos (published_at DESC NULLS LAST);
CREATE INDEX IF NOT EXISTS videos_updated_idx ON videos (last_updated DESC);

CREATE TABLE IF NOT EXISTS video_snapshots (
    id            BIGSERIAL PRIMARY KEY,
    video_id      TEXT NOT NULL,
    snapshot_time TIMESTAMPTZ NOT NULL,
    views         BIGINT NOT NULL,
    likes         BIGINT NOT NULL,
    comments      BIGINT NOT NULL,
    shares        BIGINT NOT NULL
);
CREATE INDEX IF NOT EXISTS video_snapshots_video_time_idx
    ON video_snapshots (video_id, snapshot_time);
";

const UPSERT_VIDEO: &str = "INSERT INTO videos (platform_id, source, description, published_at, url, \
     views, likes, comments, shares, content_meta, author, virality_score, engagement_rate, last_updated) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
     ON CONFLICT (platform_id) DO UPDATE SET \
     source = EXCLUDED.source, description = EXCLUDED.description, \
     published_at = EXCLUDED.published_at, url = EXCLUDED.url, \
     views = EXCLUDED.views, likes = EXCLUDED.likes, comments = EXCLUDED.comments, \
     shares = EXCLUDED.shares, content_meta = EXCLUDED.content_meta, author = EXCLUDED.author, \
     virality_score = EXCLUDED.virality_score, engagement_rate = EXCLUDED.engagement_rate, \
     last_updated = EXCLUDED.last_updated";

const VIDEO_COLUMNS: &str = "platform_id, source, description, published_at, url, views, likes, \
     comments, shares, content_meta, author, virality_score, engagement_rate, last_updated";

/// Row shape of the `videos` table.
#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    platform_id: String,
    source: String,
    description: String,
    published_at: Option<DateTime<Utc>>,
    url: String,
    views: i64,
    likes: i64,
    comments: i64,
    shares: i64,
    content_meta: Json<ContentMeta>,
    author: Json<Author>,
    virality_score: i32,
    engagement_rate: f64,
    last_updated: DateTime<Utc>,
}

impl From<VideoRow> for VideoAggregate {
    fn from(row: VideoRow) -> Self {
        Self {
            platform_id: row.platform_id,
            source: row.source,
            description: row.description,
            published_at: row.published_at,
            url: row.url,
            stats: stats_from_columns(row.views, row.likes, row.comments, row.shares),
            content_meta: row.content_meta.0,
            author: row.author.0,
            virality_score: u32::try_from(row.virality_score).unwrap_or(0),
            engagement_rate: row.engagement_rate,
            last_updated: row.last_updated,
        }
    }
}

/// Counters are stored as `BIGINT`; values above `i64::MAX` saturate.
fn to_column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn stats_from_columns(views: i64, likes: i64, comments: i64, shares: i64) -> Stats {
    let from = |v: i64| u64::try_from(v).unwrap_or(0);
    Stats {
        views: from(views),
        likes: from(likes),
        comments: from(comments),
        shares: from(shares),
    }
}

/// `ORDER BY` clause for a trending ordering, with `platform_id` as
/// tie-breaker. Built from a closed set, never from request input.
fn order_clause(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::Newest => "published_at DESC NULLS LAST, platform_id ASC",
        SortBy::MostViewed => "views DESC, platform_id ASC",
        SortBy::Virality => "virality_score DESC, platform_id ASC",
        SortBy::LastUpdated => "last_updated DESC, platform_id ASC",
    }
}

/// Relational backend using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing pool. The schema is not touched.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool, runs a liveness query, and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] if the database cannot be
    /// reached or the schema cannot be created.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(AnalyzerError::persistence)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(AnalyzerError::persistence)?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        tracing::info!("connected to postgres");
        Ok(store)
    }

    /// Creates tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), AnalyzerError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(AnalyzerError::persistence)?;
        Ok(())
    }

    async fn upsert(&self, video: &VideoAggregate) -> Result<(), AnalyzerError> {
        sqlx::query(UPSERT_VIDEO)
            .bind(&video.platform_id)
            .bind(&video.source)
            .bind(&video.description)
            .bind(video.published_at)
            .bind(&video.url)
            .bind(to_column(video.stats.views))
            .bind(to_column(video.stats.likes))
            .bind(to_column(video.stats.comments))
            .bind(to_column(video.stats.shares))
            .bind(Json(&video.content_meta))
            .bind(Json(&video.author))
            .bind(i32::try_from(video.virality_score).unwrap_or(i32::MAX))
            .bind(video.engagement_rate)
            .bind(video.last_updated)
            .execute(&self.pool)
            .await
            .map_err(|e| AnalyzerError::Persistence(format!("upsert into videos: {e}")))?;
        Ok(())
    }

    async fn append(&self, snapshot: &Snapshot) -> Result<(), AnalyzerError> {
        sqlx::query(
            "INSERT INTO video_snapshots (video_id, snapshot_time, views, likes, comments, shares) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&snapshot.video_id)
        .bind(snapshot.snapshot_time)
        .bind(to_column(snapshot.stats.views))
        .bind(to_column(snapshot.stats.likes))
        .bind(to_column(snapshot.stats.comments))
        .bind(to_column(snapshot.stats.shares))
        .execute(&self.pool)
        .await
        .map_err(|e| AnalyzerError::Persistence(format!("insert into video_snapshots: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn save_snapshot(&self, event: &EngagementEvent) -> Result<(), AnalyzerError> {
        if !event.is_video() {
            return Ok(());
        }
        let now = Utc::now();
        let video = VideoAggregate::from_event(event, now);

        let upsert = self.upsert(&video).await;
        let append = self.append(&Snapshot::from_event(event, now)).await;
        settle_dual_write(&video.platform_id, upsert, append)?;

        tracing::info!(
            video_id = %video.platform_id,
            virality = video.virality_score,
            "video updated"
        );
        Ok(())
    }

    async fn get_trending_videos(
        &self,
        params: &TrendingParams,
    ) -> Result<TrendingPage, AnalyzerError> {
        let platform = params.platform.as_deref();

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE ($1::TEXT IS NULL OR source = $1)")
                .bind(platform)
                .fetch_one(&self.pool)
                .await
                .map_err(AnalyzerError::persistence)?;

        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE ($1::TEXT IS NULL OR source = $1) \
             ORDER BY {} LIMIT $2 OFFSET $3",
            order_clause(params.sort_by)
        );
        let rows = sqlx::query_as::<_, VideoRow>(&sql)
            .bind(platform)
            .bind(to_column(params.limit))
            .bind(to_column(params.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(AnalyzerError::persistence)?;

        Ok(TrendingPage {
            items: rows.into_iter().map(VideoAggregate::from).collect(),
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn get_leaderboard(&self) -> Result<Vec<VideoAggregate>, AnalyzerError> {
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY {} LIMIT $1",
            order_clause(SortBy::Virality)
        );
        let rows = sqlx::query_as::<_, VideoRow>(&sql)
            .bind(to_column(LEADERBOARD_SIZE))
            .fetch_all(&self.pool)
            .await
            .map_err(AnalyzerError::persistence)?;
        Ok(rows.into_iter().map(VideoAggregate::from).collect())
    }

    async fn get_video_trajectory(&self, video_id: &str) -> Result<Vec<Snapshot>, AnalyzerError> {
        let rows = sqlx::query_as::<_, (String, DateTime<Utc>, i64, i64, i64, i64)>(
            "SELECT video_id, snapshot_time, views, likes, comments, shares FROM video_snapshots \
             WHERE video_id = $1 ORDER BY snapshot_time ASC, id ASC",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AnalyzerError::persistence)?;

        Ok(rows
            .into_iter()
            .map(
                |(video_id, snapshot_time, views, likes, comments, shares)| Snapshot {
                    video_id,
                    snapshot_time,
                    stats: stats_from_columns(views, likes, comments, shares),
                },
            )
            .collect())
    }

    async fn get_stats(&self) -> Result<StoreStats, AnalyzerError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await
            .map_err(AnalyzerError::persistence)?;
        Ok(StoreStats::nominal(u64::try_from(total).unwrap_or(0)))
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("postgres pool closed");
    }
}
