//! Message-source preflight.
//!
//! Before the consumer starts, every configured broker is tried in order
//! until one answers. The first broker that answers decides the outcome:
//! the topic must exist there and have at least one partition.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::types::RDKafkaRespErr;
use tokio::net::TcpStream;

use crate::error::AnalyzerError;

/// Default dial and metadata timeout per broker.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Why a single broker probe failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The broker did not accept a connection in time; try the next one.
    Unreachable(String),
    /// The broker answered but the metadata request failed.
    Metadata(String),
}

/// Asks one broker about one topic.
#[async_trait]
pub trait BrokerProbe: Send + Sync {
    /// Returns the topic's partition count, or `None` if the broker does
    /// not know the topic.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the broker cannot be reached or its
    /// metadata cannot be read.
    async fn partition_count(&self, broker: &str, topic: &str)
    -> Result<Option<usize>, ProbeError>;
}

/// Checks that at least one broker answers and knows `topic`. Returns the
/// address of the broker that answered.
///
/// # Errors
///
/// - [`AnalyzerError::BrokerUnreachable`] if no broker answers;
/// - [`AnalyzerError::TopicMissing`] / [`AnalyzerError::TopicWithoutPartitions`]
///   if the first answering broker does not have a usable topic;
/// - [`AnalyzerError::BrokerMetadata`] if that broker's metadata request fails.
pub async fn check_message_source<P>(
    probe: &P,
    brokers: &[String],
    topic: &str,
) -> Result<String, AnalyzerError>
where
    P: BrokerProbe + ?Sized,
{
    tracing::info!(topic, brokers = brokers.len(), "checking message source");
    for broker in brokers {
        match probe.partition_count(broker, topic).await {
            Err(ProbeError::Unreachable(reason)) => {
                tracing::warn!(%broker, %reason, "broker unreachable; trying next");
            }
            Err(ProbeError::Metadata(reason)) => {
                return Err(AnalyzerError::BrokerMetadata {
                    topic: topic.to_string(),
                    broker: broker.clone(),
                    reason,
                });
            }
            Ok(None) => {
                return Err(AnalyzerError::TopicMissing {
                    topic: topic.to_string(),
                    broker: broker.clone(),
                });
            }
            Ok(Some(0)) => {
                return Err(AnalyzerError::TopicWithoutPartitions {
                    topic: topic.to_string(),
                    broker: broker.clone(),
                });
            }
            Ok(Some(partitions)) => {
                tracing::info!(%broker, topic, partitions, "message source reachable");
                return Ok(broker.clone());
            }
        }
    }
    Err(AnalyzerError::BrokerUnreachable {
        tried: brokers.len(),
    })
}

/// [`BrokerProbe`] backed by a TCP dial and an `rdkafka` metadata request.
#[derive(Debug, Clone, Copy)]
pub struct KafkaProbe {
    timeout: Duration,
}

impl KafkaProbe {
    /// Creates a probe with the given per-broker timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for KafkaProbe {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}

#[async_trait]
impl BrokerProbe for KafkaProbe {
    async fn partition_count(
        &self,
        broker: &str,
        topic: &str,
    ) -> Result<Option<usize>, ProbeError> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(broker)).await {
            Ok(Ok(_stream)) => {}
            Ok(Err(e)) => return Err(ProbeError::Unreachable(e.to_string())),
            Err(_) => {
                return Err(ProbeError::Unreachable(format!(
                    "dial timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        }

        let broker = broker.to_string();
        let topic = topic.to_string();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || fetch_partition_count(&broker, &topic, timeout))
            .await
            .map_err(|e| ProbeError::Metadata(e.to_string()))?
    }
}

/// Blocking metadata lookup against a single bootstrap broker.
fn fetch_partition_count(
    broker: &str,
    topic: &str,
    timeout: Duration,
) -> Result<Option<usize>, ProbeError> {
    let consumer: BaseConsumer = ClientConfig::new()
        .set("bootstrap.servers", broker)
        .set("allow.auto.create.topics", "false")
        .create()
        .map_err(|e| ProbeError::Metadata(e.to_string()))?;

    let metadata = consumer
        .fetch_metadata(Some(topic), timeout)
        .map_err(|e| ProbeError::Metadata(e.to_string()))?;

    let Some(entry) = metadata.topics().iter().find(|t| t.name() == topic) else {
        return Ok(None);
    };
    match entry.error() {
        None => Ok(Some(entry.partitions().len())),
        Some(RDKafkaRespErr::RD_KAFKA_RESP_ERR_UNKNOWN_TOPIC_OR_PART) => Ok(None),
        Some(err) => Err(ProbeError::Metadata(format!("{err:?}"))),
    }
}
