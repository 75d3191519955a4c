//! # virality-analyzer
//!
//! Ingestion pipeline and read API for social-media engagement events.
//!
//! Events arrive as JSON messages on a Kafka topic. Each `"video"` event is
//! scored and written twice: an upsert of the item's current aggregate and
//! an append to its snapshot history. A small HTTP API serves trending
//! lists, a leaderboard, per-item trajectories, and summary counters from
//! the same store.
//!
//! ## Architecture
//!
//! ```text
//! Kafka topic                       Clients (HTTP)
//!     │                                  │
//!     ├── MessageConsumer (consumer/)    ├── REST Handlers (api/)
//!     │     decode + score (domain/)     ├── QueryService (service/)
//!     │                                  │
//!     └────────── SnapshotStore (store/) ┘
//!                  ├── MongoDB
//!                  ├── PostgreSQL
//!                  └── in-memory
//! ```
//!
//! Startup (`bootstrap/`) connects the store with bounded retry and checks
//! that a broker answers and carries the topic before anything consumes.

pub mod api;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
