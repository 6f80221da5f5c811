//! Mock message bus for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bus::{BusError, BusMessage, LocalBus, MessageBus, Subscription};

/// Mock implementation of the MessageBus trait.
///
/// Provides controllable behavior for testing:
/// - Records every published message for assertions
/// - Fails publishes on chosen topics
/// - Delivers published messages to subscribers like a real bus
///
/// # Example
///
/// ```rust,ignore
/// use mrcontent_core::testing::MockBus;
///
/// let bus = MockBus::new();
/// bus.fail_topic("createexperience").await;
///
/// dispatcher.run(&record).await;
///
/// assert_eq!(bus.published_on("compressimage").await.len(), 1);
/// ```
pub struct MockBus {
    /// Successfully published messages, in order.
    published: Arc<RwLock<Vec<BusMessage>>>,
    /// Topics whose publishes fail.
    failing_topics: Arc<RwLock<HashSet<String>>>,
    /// Delivery to subscribers.
    inner: LocalBus,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBus {
    /// Create a new mock bus.
    pub fn new() -> Self {
        Self {
            published: Arc::new(RwLock::new(Vec::new())),
            failing_topics: Arc::new(RwLock::new(HashSet::new())),
            inner: LocalBus::new(64),
        }
    }

    /// Get all published messages.
    pub async fn published(&self) -> Vec<BusMessage> {
        self.published.read().await.clone()
    }

    /// Payloads published on one topic.
    pub async fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .read()
            .await
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.payload.clone())
            .collect()
    }

    /// Get the number of successful publishes.
    pub async fn publish_count(&self) -> usize {
        self.published.read().await.len()
    }

    /// Clear recorded messages.
    pub async fn clear_published(&self) {
        self.published.write().await.clear();
    }

    /// Make every publish to `topic` fail.
    pub async fn fail_topic(&self, topic: &str) {
        self.failing_topics.write().await.insert(topic.to_string());
    }

    /// Let publishes to every topic succeed again.
    pub async fn clear_failures(&self) {
        self.failing_topics.write().await.clear();
    }
}

#[async_trait]
impl MessageBus for MockBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        if self.failing_topics.read().await.contains(topic) {
            return Err(BusError::PublishFailed {
                topic: topic.to_string(),
                reason: "mock failure".to_string(),
            });
        }

        self.published.write().await.push(BusMessage {
            topic: topic.to_string(),
            payload: payload.clone(),
        });
        self.inner.publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        self.inner.subscribe(topic).await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
