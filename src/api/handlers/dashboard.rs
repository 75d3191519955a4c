//! Dashboard handlers: trending, leaderboard, stats, trajectory.
//!
//! Mounted under `/internal` behind the internal API key.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{PaginationMeta, TrendingQuery, TrendingResponse};
use crate::app_state::AppState;
use crate::domain::{Snapshot, StoreStats, VideoAggregate};
use crate::error::{AnalyzerError, ErrorResponse};

/// `GET /internal/trending`: one page of aggregates.
///
/// # Errors
///
/// Returns [`AnalyzerError`] on invalid pagination or store failure.
#[utoipa::path(
    get,
    path = "/internal/trending",
    tag = "Dashboard",
    summary = "Trending videos",
    description = "Returns one page of tracked videos. `sort_by` selects the ordering, `platform` filters by exact source match. `limit` has no upper bound.",
    params(TrendingQuery),
    responses(
        (status = 200, description = "One page of videos", body = TrendingResponse),
        (status = 400, description = "Malformed query or invalid pagination", body = ErrorResponse),
        (status = 403, description = "Missing or wrong internal key", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn get_trending(
    State(state): State<AppState>,
    query: Result<Query<TrendingQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AnalyzerError> {
    let Query(query) = query?;
    let (params, page) = state.query_service.trending(&query.into()).await?;
    Ok(Json(TrendingResponse {
        data: page.items,
        pagination: PaginationMeta {
            total: page.total,
            page: params.page,
            limit: params.limit,
        },
    }))
}

/// `GET /internal/leaderboard`: Top five videos by virality score.
///
/// # Errors
///
/// Returns [`AnalyzerError`] on store failure.
#[utoipa::path(
    get,
    path = "/internal/leaderboard",
    tag = "Dashboard",
    summary = "Leaderboard",
    responses(
        (status = 200, description = "Top videos, highest score first", body = Vec<VideoAggregate>),
        (status = 403, description = "Missing or wrong internal key", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AnalyzerError> {
    Ok(Json(state.query_service.leaderboard().await?))
}

/// `GET /internal/stats`: Summary counters.
///
/// # Errors
///
/// Returns [`AnalyzerError`] on store failure.
#[utoipa::path(
    get,
    path = "/internal/stats",
    tag = "Dashboard",
    summary = "Store statistics",
    description = "`total_assets` may be an estimate on the document backend.",
    responses(
        (status = 200, description = "Summary counters", body = StoreStats),
        (status = 403, description = "Missing or wrong internal key", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AnalyzerError> {
    Ok(Json(state.query_service.stats().await?))
}

/// `GET /internal/video/{video_id}/trajectory`: Snapshot history.
///
/// # Errors
///
/// Returns [`AnalyzerError`] on store failure.
#[utoipa::path(
    get,
    path = "/internal/video/{video_id}/trajectory",
    tag = "Dashboard",
    summary = "Video trajectory",
    description = "Every recorded snapshot for the video, oldest first. Unknown ids return an empty array.",
    params(("video_id" = String, Path, description = "Platform content id")),
    responses(
        (status = 200, description = "Snapshot history", body = Vec<Snapshot>),
        (status = 403, description = "Missing or wrong internal key", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn get_trajectory(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, AnalyzerError> {
    Ok(Json(state.query_service.trajectory(&video_id).await?))
}

/// Dashboard routes, relative to `/internal`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trending", get(get_trending))
        .route("/leaderboard", get(get_leaderboard))
        .route("/stats", get(get_stats))
        .route("/video/{video_id}/trajectory", get(get_trajectory))
}
