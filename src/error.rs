//! Analyzer error types with HTTP status code mapping.
//!
//! [`AnalyzerError`] is the central error type. Bootstrap variants are fatal
//! and end the process; decode and persistence variants are recovered by the
//! consumer loop; the rest surface through the query API as structured JSON.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "persistence error: connection reset"
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Service-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Validation | 400 Bad Request / 403     |
/// | 3000–3999 | Server     | 500 Internal Server Error |
/// | 5000–5999 | Bootstrap  | 503 Service Unavailable   |
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The store could not be reached after every retry.
    #[error("store unreachable after {attempts} attempts: {reason}")]
    StoreUnavailable {
        /// Number of attempts made.
        attempts: u32,
        /// Last connection or ping failure.
        reason: String,
    },

    /// None of the configured brokers answered.
    #[error("could not reach any message broker ({tried} tried)")]
    BrokerUnreachable {
        /// Number of broker addresses tried.
        tried: usize,
    },

    /// The broker answered but does not know the topic.
    #[error("topic '{topic}' not found on broker {broker}")]
    TopicMissing {
        /// Configured topic name.
        topic: String,
        /// Broker that answered.
        broker: String,
    },

    /// The topic exists but has no partitions.
    #[error("topic '{topic}' exists on broker {broker} but has no partitions")]
    TopicWithoutPartitions {
        /// Configured topic name.
        topic: String,
        /// Broker that answered.
        broker: String,
    },

    /// A broker accepted the connection but the metadata request failed.
    #[error("failed to read metadata for topic '{topic}' from broker {broker}: {reason}")]
    BrokerMetadata {
        /// Configured topic name.
        topic: String,
        /// Broker that answered.
        broker: String,
        /// Underlying failure.
        reason: String,
    },

    /// A message value was not a valid engagement event.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A read or write against the store failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Query parameters failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or wrong internal API key.
    #[error("forbidden")]
    Forbidden,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AnalyzerError {
    /// Returns `true` for errors that must abort startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. }
                | Self::BrokerUnreachable { .. }
                | Self::TopicMissing { .. }
                | Self::TopicWithoutPartitions { .. }
                | Self::BrokerMetadata { .. }
                | Self::Config(_)
        )
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Decode(_) => 1002,
            Self::Forbidden => 1003,
            Self::Persistence(_) => 3001,
            Self::Config(_) => 3002,
            Self::StoreUnavailable { .. } => 5001,
            Self::BrokerUnreachable { .. } => 5002,
            Self::TopicMissing { .. } => 5003,
            Self::TopicWithoutPartitions { .. } => 5004,
            Self::BrokerMetadata { .. } => 5005,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Persistence(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable { .. }
            | Self::BrokerUnreachable { .. }
            | Self::TopicMissing { .. }
            | Self::TopicWithoutPartitions { .. }
            | Self::BrokerMetadata { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Wraps any displayable store failure as [`AnalyzerError::Persistence`].
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<QueryRejection> for AnalyzerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AnalyzerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_variants_are_fatal() {
        let store = AnalyzerError::StoreUnavailable {
            attempts: 10,
            reason: "connection refused".to_string(),
        };
        assert!(store.is_fatal());
        assert!(AnalyzerError::BrokerUnreachable { tried: 2 }.is_fatal());
        assert!(!AnalyzerError::Persistence("boom".to_string()).is_fatal());
        assert!(!AnalyzerError::InvalidRequest("page".to_string()).is_fatal());
    }

    #[test]
    fn messages_name_the_failed_precondition() {
        let topic = AnalyzerError::TopicMissing {
            topic: "events".to_string(),
            broker: "kafka:9092".to_string(),
        };
        assert_eq!(topic.to_string(), "topic 'events' not found on broker kafka:9092");
        let store = AnalyzerError::StoreUnavailable {
            attempts: 10,
            reason: "refused".to_string(),
        };
        assert!(store.to_string().starts_with("store unreachable after 10 attempts"));
    }

    #[test]
    fn status_codes_follow_categories() {
        assert_eq!(
            AnalyzerError::InvalidRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AnalyzerError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AnalyzerError::Persistence(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn malformed_json_is_a_non_fatal_decode_error() {
        let Err(json_err) = serde_json::from_slice::<serde_json::Value>(b"{oops") else {
            panic!("payload must not parse");
        };
        let err = AnalyzerError::from(json_err);
        assert!(matches!(err, AnalyzerError::Decode(_)));
        assert_eq!(err.error_code(), 1002);
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("decode error:"));
    }

    #[test]
    fn into_response_sets_status() {
        let response = AnalyzerError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
