//! Redis pub/sub implementation of Bus

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, error};

use crate::{
    bus::{Bus, Subscription},
    envelope::Envelope,
    error::{MeshError, MeshResult},
    types::Channel,
};

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Maximum number of pooled publish connections
    pub pool_size: usize,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Command timeout in seconds
    pub command_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            connect_timeout_secs: 5,
            command_timeout_secs: 3,
        }
    }
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }
}

/// Bus over Redis PUBLISH/SUBSCRIBE
///
/// Publishes go through a deadpool connection pool. Every subscription opens
/// its own pub/sub connection, which is closed when the subscription is
/// dropped or unsubscribed.
pub struct RedisBus {
    pool: deadpool_redis::Pool,
    client: redis::Client,
    config: RedisConfig,
}

impl RedisBus {
    /// Connect with default configuration
    pub async fn new(url: impl Into<String>) -> MeshResult<Self> {
        Self::with_config(RedisConfig::new(url)).await
    }

    /// Connect with custom configuration, verifying reachability with PING
    pub async fn with_config(config: RedisConfig) -> MeshResult<Self> {
        if config.pool_size == 0 {
            return Err(MeshError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }

        let mut pool_config = deadpool_redis::Config::from_url(&config.url);
        pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size));

        let pool = pool_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| MeshError::ConnectionFailed(e.to_string()))?;

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| MeshError::ConnectionFailed(e.to_string()))?;

        let bus = Self {
            pool,
            client,
            config,
        };
        bus.ping().await?;

        debug!(url = %bus.config.url, "Redis bus connected");
        Ok(bus)
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    async fn get_connection(&self) -> MeshResult<deadpool_redis::Connection> {
        let wait = Duration::from_secs(self.config.connect_timeout_secs);
        tokio::time::timeout(wait, self.pool.get())
            .await
            .map_err(|_| {
                MeshError::ConnectionFailed(format!(
                    "timed out after {}s waiting for a connection",
                    self.config.connect_timeout_secs
                ))
            })?
            .map_err(|e| MeshError::ConnectionFailed(e.to_string()))
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.config.command_timeout_secs)
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &Channel, envelope: &Envelope) -> MeshResult<()> {
        let json = envelope.to_json()?;
        let mut conn = self.get_connection().await?;

        let receivers = tokio::time::timeout(
            self.command_timeout(),
            conn.publish::<_, _, i64>(channel.as_str(), json),
        )
        .await
        .map_err(|_| MeshError::PublishFailed("command timed out".to_string()))?
        .map_err(|e| MeshError::PublishFailed(e.to_string()))?;

        debug!(
            channel = %channel,
            message_type = %envelope.message_type,
            receivers,
            "Published envelope"
        );
        Ok(())
    }

    async fn subscribe(&self, channel: &Channel) -> MeshResult<Subscription> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| MeshError::ConnectionFailed(e.to_string()))?;

        pubsub
            .subscribe(channel.as_str())
            .await
            .map_err(|e| MeshError::SubscribeFailed(e.to_string()))?;

        debug!(channel = %channel, "Subscribed");

        let stream = pubsub.into_on_message().map(|msg| {
            let raw: String = msg.get_payload().map_err(|e| {
                error!("Failed to read message payload: {}", e);
                MeshError::ReceiveFailed(e.to_string())
            })?;
            Envelope::from_json(&raw)
        });

        Ok(Subscription::new(channel.clone(), Box::pin(stream)))
    }

    async fn unsubscribe(&self, subscription: Subscription) -> MeshResult<()> {
        // Dropping the stream closes its dedicated pub/sub connection
        let channel = subscription.channel().clone();
        drop(subscription);
        debug!(channel = %channel, "Unsubscribed");
        Ok(())
    }

    async fn ping(&self) -> MeshResult<()> {
        let mut conn = self.get_connection().await?;
        tokio::time::timeout(
            self.command_timeout(),
            redis::cmd("PING").query_async::<String>(&mut *conn),
        )
        .await
        .map_err(|_| MeshError::ConnectionFailed("PING timed out".to_string()))?
        .map_err(|e| MeshError::ConnectionFailed(format!("PING failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config() {
        let config = RedisConfig::new("redis://localhost:6379")
            .with_pool_size(20)
            .with_connect_timeout(10)
            .with_command_timeout(1);

        assert_eq!(config.pool_size, 20);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.command_timeout_secs, 1);
    }

    #[tokio::test]
    async fn test_zero_pool_size_rejected() {
        let config = RedisConfig::new("redis://localhost:6379").with_pool_size(0);
        let err = RedisBus::with_config(config).await.err().unwrap();
        assert!(matches!(err, MeshError::InvalidConfig(_)));
    }
}
