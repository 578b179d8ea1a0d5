//! Activity queue abstraction for production and testing.
//!
//! Chat-side producers publish award and badge events to NATS; the points
//! engine consumes them through the [`ActivityQueue`] trait so tests can
//! script an inbound stream without a broker. Consumption uses a queue
//! group: NATS delivers each message to one engine instance, giving
//! at-least-once semantics across restarts and redeliveries.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::{Mutex, RwLock};

/// Subject carrying `AwardPoints` payloads.
pub const AWARD_SUBJECT: &str = "points.award";

/// Subject carrying `BadgeUpdate` payloads.
pub const BADGE_SUBJECT: &str = "points.badges";

/// Queue group shared by engine instances so each message lands on one.
pub const QUEUE_GROUP: &str = "points-engine";

/// A message taken off the queue.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// The inbound message stream handed to the ingestor.
pub type MessageStream = BoxStream<'static, QueueMessage>;

/// Trait for consuming the activity subjects.
///
/// This allows swapping between real NATS and test doubles.
#[async_trait]
pub trait ActivityQueue: Send + Sync {
    /// Open the combined stream of award and badge messages.
    async fn subscribe(&self) -> Result<MessageStream>;
}

/// Trait for publishing onto the activity subjects (used by the presence
/// producer).
#[async_trait]
pub trait ActivityPublisher: Send + Sync {
    /// Publish a message to a subject.
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;
}

/// Real NATS-backed queue.
pub struct NatsActivityQueue {
    client: async_nats::Client,
}

impl NatsActivityQueue {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActivityQueue for NatsActivityQueue {
    async fn subscribe(&self) -> Result<MessageStream> {
        let awards = self
            .client
            .queue_subscribe(AWARD_SUBJECT, QUEUE_GROUP.to_string())
            .await?;
        let badges = self
            .client
            .queue_subscribe(BADGE_SUBJECT, QUEUE_GROUP.to_string())
            .await?;
        let merged = stream::select(awards, badges).map(|message| QueueMessage {
            subject: message.subject.to_string(),
            payload: message.payload,
        });
        Ok(merged.boxed())
    }
}

#[async_trait]
impl ActivityPublisher for NatsActivityQueue {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.client.publish(subject, payload).await?;
        Ok(())
    }
}

/// Mock queue that tracks published messages and replays a scripted inbound
/// stream for testing.
///
/// This allows tests to feed the ingestor a fixed sequence of messages and
/// inspect what the presence producer would have published, without
/// requiring a real broker.
#[derive(Default)]
pub struct TestQueue {
    /// Messages published by the code under test.
    published: RwLock<Vec<PublishedMessage>>,
    /// Messages the next `subscribe()` call will replay, in order.
    inbound: Mutex<Vec<QueueMessage>>,
}

impl TestQueue {
    /// Create a new test queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script an inbound message for the next subscriber.
    pub fn push_inbound(&self, subject: &str, payload: impl Into<Bytes>) {
        self.inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(QueueMessage {
                subject: subject.to_string(),
                payload: payload.into(),
            });
    }

    /// Script an inbound JSON message for the next subscriber.
    pub fn push_inbound_json(&self, subject: &str, value: &serde_json::Value) {
        self.push_inbound(subject, value.to_string());
    }

    /// Get all published messages.
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Get published messages for a specific subject.
    pub fn messages_for_subject(&self, subject: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Check if any message was published to a subject.
    pub fn was_published_to(&self, subject: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|m| m.subject == subject)
    }

    /// Get the count of messages published to a specific subject.
    pub fn publish_count_for(&self, subject: &str) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .count()
    }

    /// Deserialize a published message payload as JSON.
    pub fn deserialize_message<T: serde::de::DeserializeOwned>(
        &self,
        msg: &PublishedMessage,
    ) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&msg.payload)
    }

    /// Clear all recorded and scripted messages.
    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[async_trait]
impl ActivityQueue for TestQueue {
    async fn subscribe(&self) -> Result<MessageStream> {
        let scripted: Vec<QueueMessage> = self
            .inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        Ok(stream::iter(scripted).boxed())
    }
}

#[async_trait]
impl ActivityPublisher for TestQueue {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage { subject, payload });
        Ok(())
    }
}
