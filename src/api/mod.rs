//! REST API layer: handlers and router composition.
//!
//! Dashboard endpoints live under `/internal` behind the shared-key guard;
//! `/health` and the API docs are open.

pub mod auth;
pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use axum::middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete API router. `state` is needed up front by the
/// internal-key guard; the caller still attaches it with `with_state`.
pub fn build_router(state: &AppState) -> Router<AppState> {
    let internal = handlers::dashboard::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_internal_key,
    ));

    let router = Router::new()
        .nest("/internal", internal)
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url(openapi::OPENAPI_PATH, openapi::ApiDoc::openapi()),
        )
    };

    router
}

/// Builds the served application: API routes, request tracing, permissive
/// CORS, and the attached state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(build_router(&state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
