//! Service layer: read-side orchestration over the snapshot store.
//!
//! [`QueryService`] applies request defaults and validation, then delegates
//! to the shared [`crate::store::SnapshotStore`].

pub mod query_service;

pub use query_service::{QueryService, TrendingRequest};
