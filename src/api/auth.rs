//! Shared-key guard for `/internal/*`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;
use crate::error::AnalyzerError;

/// Header carrying the internal API key.
pub const INTERNAL_KEY_HEADER: &str = "x-internal-api-key";

/// Rejects requests whose `X-Internal-API-Key` does not match the
/// configured key. With no key configured every request passes.
///
/// # Errors
///
/// Returns [`AnalyzerError::Forbidden`] on a missing or wrong key.
pub async fn require_internal_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AnalyzerError> {
    if let Some(expected) = state.internal_api_key.as_deref() {
        let provided = request
            .headers()
            .get(INTERNAL_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            tracing::warn!(path = %request.uri().path(), "rejected internal request");
            return Err(AnalyzerError::Forbidden);
        }
    }
    Ok(next.run(request).await)
}
