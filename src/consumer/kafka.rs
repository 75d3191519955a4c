//! Kafka message source backed by an `rdkafka` [`StreamConsumer`].
//!
//! Joins the configured consumer group and subscribes to the topic. Offsets
//! are committed by the client's default auto-commit; a new group starts
//! from the earliest retained offset.

use std::fmt;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::Message;
use rdkafka::consumer::{Consumer, StreamConsumer};

use super::{InboundMessage, MessageSource, SourceError};
use crate::error::AnalyzerError;

/// [`MessageSource`] reading one topic as a member of a consumer group.
pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
    group_id: String,
}

impl KafkaSource {
    /// Creates the group consumer and subscribes to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Config`] if the client cannot be created or
    /// the subscription is rejected.
    pub fn subscribe(
        brokers: &[String],
        topic: &str,
        group_id: &str,
    ) -> Result<Self, AnalyzerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("allow.auto.create.topics", "false")
            .create()
            .map_err(|e| AnalyzerError::Config(format!("kafka consumer: {e}")))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| AnalyzerError::Config(format!("subscribe to '{topic}': {e}")))?;

        tracing::info!(topic, group_id, "subscribed to topic");
        Ok(Self {
            consumer,
            topic: topic.to_string(),
            group_id: group_id.to_string(),
        })
    }
}

impl fmt::Debug for KafkaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaSource")
            .field("topic", &self.topic)
            .field("group_id", &self.group_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn recv(&mut self) -> Result<InboundMessage, SourceError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| SourceError::Receive(e.to_string()))?;
        Ok(InboundMessage {
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            partition: message.partition(),
            offset: message.offset(),
        })
    }

    async fn close(&mut self) {
        self.consumer.unsubscribe();
        tracing::info!(topic = %self.topic, "kafka reader released");
    }
}
