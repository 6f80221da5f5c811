//! Topic-based message bus used to exchange processing requests and results
//! with the external media processing service.

mod local;
mod nats;
mod traits;

pub use local::LocalBus;
pub use nats::NatsBus;
pub use traits::{BusError, BusMessage, MessageBus, Subscription};

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::BusConfig;

/// Build the bus described by the config.
///
/// With a `url` this connects to NATS. A failed connection is logged and the
/// in-process bus is used instead, so the API keeps serving while requests
/// stay local.
pub async fn connect_bus(config: &BusConfig) -> Arc<dyn MessageBus> {
    if let Some(url) = &config.url {
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        match NatsBus::connect(url, timeout, config.capacity).await {
            Ok(bus) => {
                info!(url = %url, "Connected to NATS");
                return Arc::new(bus);
            }
            Err(e) => {
                warn!(error = %e, "NATS unavailable, media processing messages stay in-process");
            }
        }
    }

    Arc::new(LocalBus::new(config.capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_bus_without_url_is_local() {
        let bus = connect_bus(&BusConfig::default()).await;
        assert_eq!(bus.name(), "local");
    }

    #[tokio::test]
    async fn test_connect_bus_falls_back_when_unreachable() {
        let config = BusConfig {
            url: Some("nats://127.0.0.1:1".to_string()),
            connect_timeout_ms: 500,
            ..Default::default()
        };

        let bus = connect_bus(&config).await;

        assert_eq!(bus.name(), "local");
        assert!(bus.publish("compressimage", b"{}".to_vec()).await.is_ok());
    }
}
