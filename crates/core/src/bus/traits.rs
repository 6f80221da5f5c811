use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Connect to {url} failed: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("Publish to {topic} failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Subscribe to {topic} failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    #[error("Bus closed")]
    Closed,
}

/// A message delivered on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Receiving end of a topic subscription.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<BusMessage>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, receiver: broadcast::Receiver<BusMessage>) -> Self {
        Self {
            topic: topic.into(),
            receiver,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the topic is closed. Messages dropped because the
    /// subscriber fell behind are skipped with a warning.
    pub async fn next(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        topic = %self.topic,
                        skipped,
                        "Subscriber lagged, messages dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a payload to a topic. Fire and forget: no acknowledgement from
    /// consumers is awaited.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Subscribe to a topic. Only messages published after this call are
    /// received.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError>;

    /// Name of this bus implementation
    fn name(&self) -> &'static str;
}
