//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::QueryService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read-side service for the dashboard endpoints.
    pub query_service: Arc<QueryService>,
    /// Key required in `X-Internal-API-Key` on `/internal/*`. `None` leaves
    /// those routes open.
    pub internal_api_key: Option<Arc<str>>,
}

impl AppState {
    /// Builds state around a query service.
    #[must_use]
    pub fn new(query_service: QueryService, internal_api_key: Option<String>) -> Self {
        Self {
            query_service: Arc::new(query_service),
            internal_api_key: internal_api_key.map(Arc::from),
        }
    }
}
