//! Startup preflight: store connection with retry and broker reachability.
//!
//! Both checks run once, synchronously, before the consumer starts. Any
//! failure is fatal; the process must not consume or serve against
//! infrastructure it cannot reach.

pub mod broker;
pub mod retry;

use std::future::Future;
use std::sync::Arc;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::store::{self, SnapshotStore};

pub use broker::{BrokerProbe, KafkaProbe, ProbeError, check_message_source};
pub use retry::{RetryExhausted, RetryPolicy, retry_with_backoff};

/// Connects to the configured store, retrying per `policy`.
///
/// # Errors
///
/// Returns [`AnalyzerError::StoreUnavailable`] once every attempt failed.
pub async fn connect_store(
    config: &AnalyzerConfig,
    policy: &RetryPolicy,
) -> Result<Arc<dyn SnapshotStore>, AnalyzerError> {
    tracing::info!(backend = config.store_backend.as_str(), "connecting to store");
    connect_store_with(policy, || store::connect(config)).await
}

/// Retries an arbitrary store constructor per `policy`.
///
/// # Errors
///
/// Returns [`AnalyzerError::StoreUnavailable`] once every attempt failed.
pub async fn connect_store_with<F, Fut>(
    policy: &RetryPolicy,
    connect: F,
) -> Result<Arc<dyn SnapshotStore>, AnalyzerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Arc<dyn SnapshotStore>, AnalyzerError>>,
{
    retry_with_backoff(policy, "store", connect)
        .await
        .map_err(|exhausted| AnalyzerError::StoreUnavailable {
            attempts: exhausted.attempts,
            reason: exhausted.last_error.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::MemoryStore;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 10,
            base_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn unreachable_store_maps_to_fatal_error() {
        let result = connect_store_with(&fast_policy(), || async {
            Err(AnalyzerError::Persistence("connection refused".to_string()))
        })
        .await;

        let Err(err) = result else {
            panic!("expected fatal error");
        };
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            AnalyzerError::StoreUnavailable { attempts: 10, ref reason } if reason.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn reachable_store_connects() {
        let result = connect_store_with(&fast_policy(), || async {
            let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
            Ok(store)
        })
        .await;
        let Ok(store) = result else {
            panic!("expected store");
        };
        assert_eq!(store.backend_name(), "memory");
    }
}
