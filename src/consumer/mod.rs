//! Message consumer: the ingestion loop.
//!
//! [`MessageConsumer`] owns a [`MessageSource`] and processes one message at
//! a time: receive → decode → [`SnapshotStore::save_snapshot`]. The receive
//! call is the only suspension point raced against shutdown, so a message
//! that has been received is always fully processed before the loop stops.
//!
//! Failures never stop the loop. Receive errors are logged and the loop
//! continues immediately; undecodable messages are logged with their raw
//! payload and dropped; persistence failures are logged with the item id
//! and dropped. Delivery is whatever the source's group mechanism gives by
//! default, effectively at-least-once.

pub mod channel;
pub mod kafka;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::EngagementEvent;
use crate::error::AnalyzerError;
use crate::store::SnapshotStore;

pub use channel::ChannelSource;
pub use kafka::KafkaSource;

/// One raw message pulled from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message value bytes.
    pub payload: Vec<u8>,
    /// Partition the message came from.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
}

/// Receive failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Transient receive failure; the loop logs it and continues.
    #[error("receive failed: {0}")]
    Receive(String),
    /// The source will never yield again; the loop stops.
    #[error("message source closed")]
    Closed,
}

/// A pull-based stream of raw messages.
#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next message. Must be cancel-safe.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Receive`] on transient failures and
    /// [`SourceError::Closed`] once the source is exhausted.
    async fn recv(&mut self) -> Result<InboundMessage, SourceError>;

    /// Releases the underlying reader.
    async fn close(&mut self) {}
}

/// What happened to a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Decoded and persisted.
    Processed,
    /// Decoded, not a `"video"` event; nothing written.
    Ignored,
    /// Not a valid engagement event; dropped.
    DecodeFailed,
    /// The store rejected the write; dropped.
    PersistenceFailed,
}

/// Counters accumulated over a consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Messages successfully received.
    pub received: u64,
    /// Video events persisted.
    pub processed: u64,
    /// Non-video events skipped.
    pub ignored: u64,
    /// Messages dropped because they did not decode.
    pub decode_failures: u64,
    /// Messages dropped because the store write failed.
    pub persistence_failures: u64,
    /// Receive calls that failed.
    pub receive_errors: u64,
}

impl ConsumerStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::DecodeFailed => self.decode_failures += 1,
            Outcome::PersistenceFailed => self.persistence_failures += 1,
        }
    }
}

/// Creates the shutdown channel for [`MessageConsumer::run`]. Send `true`
/// (or drop the sender) to stop the loop.
#[must_use]
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Decodes a message value into an engagement event.
///
/// # Errors
///
/// Returns [`AnalyzerError::Decode`] when the value is not a valid event.
pub fn decode(message: &InboundMessage) -> Result<EngagementEvent, AnalyzerError> {
    EngagementEvent::from_slice(&message.payload).map_err(AnalyzerError::from)
}

/// Single-task ingestion loop over a [`MessageSource`].
#[derive(Debug)]
pub struct MessageConsumer<S> {
    source: S,
    store: Arc<dyn SnapshotStore>,
    stats: ConsumerStats,
}

impl<S: MessageSource> MessageConsumer<S> {
    /// Creates a consumer that owns `source` and writes to `store`.
    #[must_use]
    pub fn new(source: S, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            source,
            store,
            stats: ConsumerStats::default(),
        }
    }

    /// Runs until `shutdown` fires (or its sender is dropped) or the source
    /// closes, then releases the source and returns the run's counters.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ConsumerStats {
        tracing::info!(
            backend = self.store.backend_name(),
            "consumer started, waiting for messages"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = self.source.recv() => received,
            };
            match received {
                Ok(message) => {
                    self.stats.received += 1;
                    let outcome = self.handle(&message).await;
                    self.stats.record(outcome);
                }
                Err(SourceError::Closed) => {
                    tracing::info!("message source closed");
                    break;
                }
                Err(err) => {
                    self.stats.receive_errors += 1;
                    tracing::error!(error = %err, "failed to read message");
                }
            }
        }

        self.source.close().await;
        let stats = self.stats;
        tracing::info!(
            received = stats.received,
            processed = stats.processed,
            ignored = stats.ignored,
            decode_failures = stats.decode_failures,
            persistence_failures = stats.persistence_failures,
            receive_errors = stats.receive_errors,
            "consumer stopped"
        );
        stats
    }

    /// Decodes and persists one message.
    pub async fn handle(&self, message: &InboundMessage) -> Outcome {
        let event = match decode(message) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    code = err.error_code(),
                    partition = message.partition,
                    offset = message.offset,
                    payload = %String::from_utf8_lossy(&message.payload),
                    "failed to decode message; dropping"
                );
                return Outcome::DecodeFailed;
            }
        };

        if !event.is_video() {
            tracing::debug!(data_type = %event.data_type, "ignoring non-video event");
            return Outcome::Ignored;
        }

        match self.store.save_snapshot(&event).await {
            Ok(()) => Outcome::Processed,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    code = err.error_code(),
                    video_id = %event.payload.platform_id,
                    source = %event.source,
                    partition = message.partition,
                    offset = message.offset,
                    "failed to persist event; dropping"
                );
                Outcome::PersistenceFailed
            }
        }
    }
}
