//! In-process bus backed by tokio broadcast channels

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

use crate::{
    bus::{Bus, Subscription},
    envelope::Envelope,
    error::MeshResult,
    types::Channel,
};

/// Default per-channel buffer before slow subscribers start lagging
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Bus living entirely inside one process
///
/// Each channel is a `tokio::sync::broadcast` of raw JSON strings, so
/// envelopes go through the same codec as on Redis. Clones share state.
#[derive(Clone)]
pub struct InMemoryBus {
    channels: Arc<RwLock<HashMap<Channel, broadcast::Sender<String>>>>,
    capacity: usize,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus whose channels buffer `capacity` messages per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Publish raw text without going through the envelope codec
    ///
    /// Returns the number of subscribers that received it.
    pub async fn publish_raw(&self, channel: &Channel, raw: impl Into<String>) -> usize {
        let channels = self.channels.read().await;
        match channels.get(channel) {
            Some(sender) => sender.send(raw.into()).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of live subscriptions on a channel
    pub async fn subscriber_count(&self, channel: &Channel) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    async fn publish(&self, channel: &Channel, envelope: &Envelope) -> MeshResult<()> {
        let json = envelope.to_json()?;
        let delivered = self.publish_raw(channel, json).await;

        if delivered == 0 {
            debug!(channel = %channel, "No subscribers, envelope dropped");
        } else {
            debug!(
                channel = %channel,
                message_type = %envelope.message_type,
                subscribers = delivered,
                "Published envelope"
            );
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &Channel) -> MeshResult<Subscription> {
        let receiver = {
            let mut channels = self.channels.write().await;
            channels
                .entry(channel.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };

        let name = channel.clone();
        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            let name = name.clone();
            async move {
                match item {
                    Ok(raw) => Some(Envelope::from_json(&raw)),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(channel = %name, skipped, "Subscriber lagged, messages lost");
                        None
                    }
                }
            }
        });

        debug!(channel = %channel, "Subscribed");
        Ok(Subscription::new(channel.clone(), Box::pin(stream)))
    }

    async fn unsubscribe(&self, subscription: Subscription) -> MeshResult<()> {
        let channel = subscription.channel().clone();
        drop(subscription);

        let mut channels = self.channels.write().await;
        if channels
            .get(&channel)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(&channel);
        }

        debug!(channel = %channel, "Unsubscribed");
        Ok(())
    }

    async fn ping(&self) -> MeshResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{MessageType, Payload};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sample(sender: &str) -> Envelope {
        let mut payload = Payload::new();
        payload.insert("tool_name".into(), json!("plan_task"));
        Envelope::tool_command(sender, payload)
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InMemoryBus::new();
        let channel = Channel::parse("agent_commands:a1").unwrap();
        let mut sub = bus.subscribe(&channel).await.unwrap();

        bus.publish(&channel, &sample("orchestrator")).await.unwrap();

        let got = timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(got.sender_id, "orchestrator");
        assert_eq!(got.message_type, MessageType::ToolCommand);
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_is_dropped() {
        let bus = InMemoryBus::new();
        let channel = Channel::orchestrator_inbox();

        bus.publish(&channel, &sample("x")).await.unwrap();

        // A later subscriber sees nothing from before it subscribed
        let mut sub = bus.subscribe(&channel).await.unwrap();
        assert!(
            timeout(Duration::from_millis(50), sub.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let bus = InMemoryBus::new();
        let a = Channel::parse("agent_commands:a").unwrap();
        let b = Channel::parse("agent_commands:b").unwrap();
        let mut sub_b = bus.subscribe(&b).await.unwrap();

        bus.publish(&a, &sample("orchestrator")).await.unwrap();

        assert!(
            timeout(Duration::from_millis(50), sub_b.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_malformed_message_yields_error_and_stream_continues() {
        let bus = InMemoryBus::new();
        let channel = Channel::orchestrator_inbox();
        let mut sub = bus.subscribe(&channel).await.unwrap();

        assert_eq!(bus.publish_raw(&channel, "{broken").await, 1);
        bus.publish(&channel, &sample("agent")).await.unwrap();

        let first = sub.next().await.unwrap();
        assert!(first.unwrap_err().is_decode_error());

        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.sender_id, "agent");
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_channel() {
        let bus = InMemoryBus::new();
        let channel = Channel::orchestrator_inbox();
        let sub = bus.subscribe(&channel).await.unwrap();
        assert_eq!(bus.subscriber_count(&channel).await, 1);

        bus.unsubscribe(sub).await.unwrap();
        assert_eq!(bus.subscriber_count(&channel).await, 0);
        assert_eq!(bus.publish_raw(&channel, "{}").await, 0);
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscriber() {
        let bus = InMemoryBus::new();
        let channel = Channel::agent_heartbeats();
        let mut first = bus.subscribe(&channel).await.unwrap();
        let mut second = bus.subscribe(&channel).await.unwrap();

        bus.publish(&channel, &sample("orchestrator")).await.unwrap();

        assert!(first.next().await.unwrap().is_ok());
        assert!(second.next().await.unwrap().is_ok());
    }
}
