//! OpenAPI document for the HTTP surface.

use utoipa::OpenApi;

use crate::api::dto::{HealthResponse, PaginationMeta, TrendingResponse};
use crate::api::handlers::{dashboard, system};
use crate::domain::{Author, ContentMeta, Snapshot, Stats, StoreStats, VideoAggregate};
use crate::error::{ErrorBody, ErrorResponse};

/// Path the OpenAPI JSON is served from.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Generated OpenAPI description.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "virality-analyzer",
        description = "Read API over ingested engagement snapshots."
    ),
    paths(
        system::health_handler,
        dashboard::get_trending,
        dashboard::get_leaderboard,
        dashboard::get_stats,
        dashboard::get_trajectory,
    ),
    components(schemas(
        VideoAggregate,
        Snapshot,
        Stats,
        ContentMeta,
        Author,
        StoreStats,
        TrendingResponse,
        PaginationMeta,
        HealthResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Dashboard", description = "Internal dashboard queries, guarded by X-Internal-API-Key"),
    )
)]
pub struct ApiDoc;
