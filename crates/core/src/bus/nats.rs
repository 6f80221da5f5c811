//! NATS-backed bus shared with the external media processing service.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::debug;

use super::{BusError, BusMessage, MessageBus, Subscription};

/// Message bus backed by a NATS connection.
///
/// Topics map one to one onto NATS subjects. Each subscription is pumped
/// into a broadcast channel so callers see the same [`Subscription`] type as
/// with the in-process bus.
pub struct NatsBus {
    client: async_nats::Client,
    capacity: usize,
}

impl NatsBus {
    /// Connect to the server at `url`, giving up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration, capacity: usize) -> Result<Self, BusError> {
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| BusError::ConnectFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            capacity: capacity.max(1),
        })
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| BusError::PublishFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        let mut subscriber = self
            .client
            .subscribe(topic.to_string())
            .await
            .map_err(|e| BusError::SubscribeFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        let (sender, receiver) = broadcast::channel(self.capacity);
        let subject = topic.to_string();
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                let message = BusMessage {
                    topic: message.subject.to_string(),
                    payload: message.payload.to_vec(),
                };
                // Every receiver is gone once the subscription is dropped.
                if sender.send(message).is_err() {
                    break;
                }
            }
            if let Err(e) = subscriber.unsubscribe().await {
                debug!(topic = %subject, error = %e, "Unsubscribe failed");
            }
        });

        Ok(Subscription::new(topic, receiver))
    }

    fn name(&self) -> &'static str {
        "nats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_unreachable_server_fails() {
        let result = NatsBus::connect("nats://127.0.0.1:1", Duration::from_millis(500), 8).await;

        match result {
            Err(BusError::ConnectFailed { url, .. }) => assert_eq!(url, "nats://127.0.0.1:1"),
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected connection failure"),
        }
    }
}
