//! Analyzer configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). The core only sees the resulting
//! [`AnalyzerConfig`]; nothing reads the environment after startup.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AnalyzerError;

/// Which [`crate::store::SnapshotStore`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Document store (MongoDB).
    Mongo,
    /// Relational store (PostgreSQL).
    Postgres,
    /// In-process store; state is lost on exit.
    Memory,
}

impl StoreBackend {
    /// Parses an explicit backend name.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Config`] for unknown names.
    pub fn parse(value: &str) -> Result<Self, AnalyzerError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AnalyzerError::Config(format!(
                "unknown STORE_BACKEND '{other}'"
            ))),
        }
    }

    /// Infers the backend from a connection string scheme.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Config`] when the scheme is not recognised.
    pub fn infer(database_url: &str) -> Result<Self, AnalyzerError> {
        if database_url.starts_with("mongodb://") || database_url.starts_with("mongodb+srv://") {
            Ok(Self::Mongo)
        } else if database_url.starts_with("postgres://")
            || database_url.starts_with("postgresql://")
        {
            Ok(Self::Postgres)
        } else if database_url == "memory" {
            Ok(Self::Memory)
        } else {
            Err(AnalyzerError::Config(
                "cannot infer store backend from DATABASE_URL; set STORE_BACKEND".to_string(),
            ))
        }
    }

    /// Short backend name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mongo => "mongo",
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// Top-level analyzer configuration.
///
/// Loaded once at startup via [`AnalyzerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Store connection string.
    pub database_url: String,

    /// Selected store backend.
    pub store_backend: StoreBackend,

    /// Database name used by the document backend.
    pub mongo_database: String,

    /// Maximum number of connections in the relational pool.
    pub database_max_connections: u32,

    /// Timeout in seconds for acquiring a relational connection.
    pub database_connect_timeout_secs: u64,

    /// Per-call timeout in seconds for document-store reads.
    pub store_query_timeout_secs: u64,

    /// Broker addresses (`host:port`).
    pub kafka_brokers: Vec<String>,

    /// Topic carrying engagement events.
    pub kafka_topic: String,

    /// Consumer group identity.
    pub kafka_group_id: String,

    /// Shared key required on `/internal/*` routes. `None` leaves them open.
    pub internal_api_key: Option<String>,

    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl AnalyzerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Config`] if the listen address cannot be
    /// parsed, the store backend is unknown, or the broker list or topic
    /// is empty.
    pub fn from_env() -> Result<Self, AnalyzerError> {
        dotenvy::dotenv().ok();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(addr) => addr,
            Err(_) => std::env::var("PORT")
                .map(|port| format!("0.0.0.0:{port}"))
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        };
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|e| AnalyzerError::Config(format!("invalid listen address: {e}")))?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(name) if !name.trim().is_empty() => StoreBackend::parse(&name)?,
            _ => StoreBackend::infer(&database_url)?,
        };

        let kafka_brokers = split_brokers(
            &std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
        );
        if kafka_brokers.is_empty() {
            return Err(AnalyzerError::Config("KAFKA_BROKERS is empty".to_string()));
        }
        let kafka_topic =
            std::env::var("KAFKA_TOPIC").unwrap_or_else(|_| "social_media_events".to_string());
        if kafka_topic.trim().is_empty() {
            return Err(AnalyzerError::Config("KAFKA_TOPIC is empty".to_string()));
        }

        let internal_api_key = std::env::var("INTERNAL_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        Ok(Self {
            listen_addr,
            database_url,
            store_backend,
            mongo_database: std::env::var("MONGO_DATABASE")
                .unwrap_or_else(|_| "virality_db".to_string()),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10),
            database_connect_timeout_secs: parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5),
            store_query_timeout_secs: parse_env("STORE_QUERY_TIMEOUT_SECS", 5),
            kafka_brokers,
            kafka_topic,
            kafka_group_id: std::env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| "virality-analyzer-group".to_string()),
            internal_api_key,
            log_json: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Per-call read timeout for the document backend.
    #[must_use]
    pub const fn store_query_timeout(&self) -> Duration {
        Duration::from_secs(self.store_query_timeout_secs)
    }
}

/// Splits a comma-separated broker list, dropping blank entries.
#[must_use]
pub fn split_brokers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_brokers_drops_blanks() {
        assert_eq!(
            split_brokers(" kafka-1:9092, ,kafka-2:9092,"),
            vec!["kafka-1:9092".to_string(), "kafka-2:9092".to_string()]
        );
        assert!(split_brokers("").is_empty());
    }

    #[test]
    fn backend_inferred_from_scheme() {
        assert!(matches!(
            StoreBackend::infer("mongodb://mongo:27017"),
            Ok(StoreBackend::Mongo)
        ));
        assert!(matches!(
            StoreBackend::infer("postgresql://u:p@db/virality"),
            Ok(StoreBackend::Postgres)
        ));
        assert!(matches!(StoreBackend::infer("memory"), Ok(StoreBackend::Memory)));
        assert!(StoreBackend::infer("redis://cache").is_err());
    }

    #[test]
    fn explicit_backend_names() {
        assert!(matches!(StoreBackend::parse("MongoDB"), Ok(StoreBackend::Mongo)));
        assert!(matches!(StoreBackend::parse(" postgres "), Ok(StoreBackend::Postgres)));
        assert!(StoreBackend::parse("sqlite").is_err());
    }
}
