//! Persistence layer: the snapshot store contract and its backends.
//!
//! [`SnapshotStore`] is the capability set shared by every backend. The
//! consumer drives [`SnapshotStore::save_snapshot`]; the query service uses
//! the four read operations. Backends are selected once at startup by
//! [`connect`] and shared as an `Arc<dyn SnapshotStore>`.
//!
//! # Dual write
//!
//! Saving a `"video"` event performs two independent writes: an idempotent
//! upsert of the [`VideoAggregate`] and a non-idempotent append of a
//! [`Snapshot`]. There is no cross-write transaction. Both writes are always
//! attempted, in that order:
//!
//! - upsert failed → the call fails with the upsert error, whatever the
//!   append outcome;
//! - only the append failed → logged at `warn`, the call succeeds;
//! - both succeeded → success.
//!
//! Readers can therefore see an aggregate slightly ahead of its history.

pub mod memory;
pub mod mongo;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{AnalyzerConfig, StoreBackend};
use crate::domain::{Snapshot, StoreStats, TrendingPage, TrendingParams, VideoAggregate};
use crate::domain::EngagementEvent;
use crate::error::AnalyzerError;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use postgres::PostgresStore;

/// Persistence contract shared by all backends.
///
/// Implementations must be safe to call concurrently: the consumer writes
/// while the query service reads, with no coordination between them.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Upserts the aggregate and appends a snapshot for a `"video"` event.
    /// Any other data type is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] when the aggregate upsert fails.
    async fn save_snapshot(&self, event: &EngagementEvent) -> Result<(), AnalyzerError>;

    /// Returns one page of aggregates plus the pre-pagination match count.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] on store failure.
    async fn get_trending_videos(
        &self,
        params: &TrendingParams,
    ) -> Result<TrendingPage, AnalyzerError>;

    /// Returns the top five aggregates by virality score.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] on store failure.
    async fn get_leaderboard(&self) -> Result<Vec<VideoAggregate>, AnalyzerError>;

    /// Returns every snapshot for `video_id`, oldest first. Unknown ids yield
    /// an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] on store failure.
    async fn get_video_trajectory(&self, video_id: &str) -> Result<Vec<Snapshot>, AnalyzerError>;

    /// Returns the number of tracked items. May be approximate.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Persistence`] on store failure.
    async fn get_stats(&self) -> Result<StoreStats, AnalyzerError>;

    /// Releases connections held by the backend.
    async fn close(&self) {}
}

/// Opens the configured backend and verifies it answers. Single attempt;
/// see [`crate::bootstrap::connect_store`] for the retrying wrapper.
///
/// # Errors
///
/// Returns [`AnalyzerError::Persistence`] if the connection or liveness
/// probe fails.
pub async fn connect(config: &AnalyzerConfig) -> Result<Arc<dyn SnapshotStore>, AnalyzerError> {
    let store: Arc<dyn SnapshotStore> = match config.store_backend {
        StoreBackend::Mongo => Arc::new(
            MongoStore::connect(
                &config.database_url,
                &config.mongo_database,
                config.store_query_timeout(),
            )
            .await?,
        ),
        StoreBackend::Postgres => Arc::new(
            PostgresStore::connect(
                &config.database_url,
                config.database_max_connections,
                Duration::from_secs(config.database_connect_timeout_secs),
            )
            .await?,
        ),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

/// Combines the outcomes of the two writes of a save according to the
/// dual-write policy documented on this module.
pub(crate) fn settle_dual_write(
    video_id: &str,
    upsert: Result<(), AnalyzerError>,
    append: Result<(), AnalyzerError>,
) -> Result<(), AnalyzerError> {
    match (upsert, append) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(append_err)) => {
            tracing::warn!(
                video_id,
                error = %append_err,
                "snapshot append failed; aggregate was updated"
            );
            Ok(())
        }
        (Err(upsert_err), append) => {
            if let Err(append_err) = append {
                tracing::warn!(video_id, error = %append_err, "snapshot append failed");
            }
            Err(upsert_err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(msg: &str) -> Result<(), AnalyzerError> {
        Err(AnalyzerError::Persistence(msg.to_string()))
    }

    #[test]
    fn both_writes_ok() {
        assert!(settle_dual_write("v1", Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn append_failure_alone_is_not_an_error() {
        assert!(settle_dual_write("v1", Ok(()), fail("append")).is_ok());
    }

    #[test]
    fn upsert_failure_is_reported_regardless_of_append() {
        let only_upsert = settle_dual_write("v1", fail("upsert"), Ok(()));
        assert!(matches!(only_upsert, Err(AnalyzerError::Persistence(m)) if m == "upsert"));

        let both = settle_dual_write("v1", fail("upsert"), fail("append"));
        assert!(matches!(both, Err(AnalyzerError::Persistence(m)) if m == "upsert"));
    }
}
