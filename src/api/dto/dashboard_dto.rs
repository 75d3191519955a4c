//! Dashboard request and response bodies.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::PaginationMeta;
use crate::domain::VideoAggregate;
use crate::service::TrendingRequest;

/// Query string of `GET /internal/trending`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendingQuery {
    /// `newest` (default), `most_viewed`, `virality`; any other value sorts
    /// by last update.
    pub sort_by: Option<String>,
    /// Exact-match platform filter.
    pub platform: Option<String>,
    /// 1-indexed page, default 1.
    pub page: Option<i64>,
    /// Page size, default 20.
    pub limit: Option<i64>,
}

impl From<TrendingQuery> for TrendingRequest {
    fn from(query: TrendingQuery) -> Self {
        Self {
            sort_by: query.sort_by,
            platform: query.platform,
            page: query.page,
            limit: query.limit,
        }
    }
}

/// Response of `GET /internal/trending`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrendingResponse {
    /// Rows on the requested page.
    pub data: Vec<VideoAggregate>,
    /// Paging information.
    pub pagination: PaginationMeta,
}
