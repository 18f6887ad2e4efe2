//! Core Bus trait for publish/subscribe messaging between the coordinator and agents

use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::{
    envelope::Envelope,
    error::{MeshError, MeshResult},
    memory::InMemoryBus,
    types::Channel,
};

/// Stream type for receiving envelopes
pub type EnvelopeStream = Pin<Box<dyn Stream<Item = MeshResult<Envelope>> + Send + 'static>>;

/// A live subscription to one channel
///
/// Yields every envelope published on the channel after the subscription was
/// created. Messages that fail to decode surface as
/// `Err(MeshError::DeserializationFailed)` and the stream keeps going; it only
/// ends when the backend connection goes away.
pub struct Subscription {
    channel: Channel,
    stream: EnvelopeStream,
}

impl Subscription {
    pub fn new(channel: Channel, stream: EnvelopeStream) -> Self {
        Self { channel, stream }
    }

    /// Channel this subscription listens on
    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

impl Stream for Subscription {
    type Item = MeshResult<Envelope>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// Publish/subscribe transport
///
/// Implementations report failures to the caller and never retry.
///
/// # Example
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use nexus_mesh::{Bus, Channel, Envelope, InMemoryBus, Payload};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryBus::new();
/// let mut inbox = bus.subscribe(&Channel::orchestrator_inbox()).await?;
///
/// bus.publish(
///     &Channel::orchestrator_inbox(),
///     &Envelope::status_update("agent-1", Payload::new()),
/// )
/// .await?;
///
/// let received = inbox.next().await;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish an envelope on a channel
    ///
    /// Delivery is fire-and-forget: an envelope published while nobody is
    /// subscribed is lost.
    async fn publish(&self, channel: &Channel, envelope: &Envelope) -> MeshResult<()>;

    /// Subscribe to a channel
    ///
    /// There is no backlog replay: only envelopes published after this call
    /// returns are delivered.
    async fn subscribe(&self, channel: &Channel) -> MeshResult<Subscription>;

    /// Release a subscription and its backend resources
    async fn unsubscribe(&self, subscription: Subscription) -> MeshResult<()>;

    /// Check that the backend is reachable
    async fn ping(&self) -> MeshResult<()>;
}

/// URL scheme selecting the in-process backend
pub const MEMORY_SCHEME: &str = "memory://";

/// Open a bus from a URL
///
/// `memory://` yields a fresh [`InMemoryBus`]; `redis://` and `rediss://`
/// connect a `RedisBus` when the `redis` feature is enabled.
pub async fn connect(url: &str) -> MeshResult<Arc<dyn Bus>> {
    if url.starts_with(MEMORY_SCHEME) {
        return Ok(Arc::new(InMemoryBus::new()));
    }

    if url.starts_with("redis://") || url.starts_with("rediss://") {
        #[cfg(feature = "redis")]
        {
            let bus = crate::redis::RedisBus::new(url).await?;
            return Ok(Arc::new(bus));
        }

        #[cfg(not(feature = "redis"))]
        {
            return Err(MeshError::InvalidConfig(format!(
                "'{}' needs the redis feature enabled",
                url
            )));
        }
    }

    Err(MeshError::InvalidConfig(format!(
        "Unsupported bus URL '{}': expected memory:// or redis://",
        url
    )))
}
