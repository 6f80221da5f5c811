//! In-process bus over tokio broadcast channels.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use super::{BusError, BusMessage, MessageBus, Subscription};

/// In-process message bus with one broadcast channel per topic.
///
/// Publishing to a topic nobody listens on succeeds and drops the message,
/// matching how a broker without consumers behaves.
pub struct LocalBus {
    capacity: usize,
    topics: RwLock<HashMap<String, broadcast::Sender<BusMessage>>>,
}

impl LocalBus {
    /// Create a bus whose per-topic channels buffer `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: RwLock::new(HashMap::new()),
        }
    }

    async fn sender(&self, topic: &str) -> broadcast::Sender<BusMessage> {
        if let Some(sender) = self.topics.read().await.get(topic) {
            return sender.clone();
        }

        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscribers on a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let sender = self.sender(topic).await;
        let message = BusMessage {
            topic: topic.to_string(),
            payload,
        };
        // A send error only means there are no receivers right now.
        if sender.send(message).is_err() {
            tracing::debug!(topic, "Published to topic without subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        let sender = self.sender(topic).await;
        Ok(Subscription::new(topic, sender.subscribe()))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
