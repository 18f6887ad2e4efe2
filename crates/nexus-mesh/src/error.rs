//! Error types for bus operations

use thiserror::Error;

/// Result type for bus operations
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors that can occur while talking to the bus
#[derive(Error, Debug)]
pub enum MeshError {
    /// Connection to messaging backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish message
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// Failed to receive message
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Failed to subscribe to channel
    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),

    /// Failed to unsubscribe from channel
    #[error("Unsubscribe failed: {0}")]
    UnsubscribeFailed(String),

    /// Envelope serialization failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Envelope deserialization failed
    #[error("Deserialization failed: {reason} (raw: {raw})")]
    DeserializationFailed { reason: String, raw: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend-specific error (Redis, etc.)
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl MeshError {
    /// Whether this error describes a malformed message rather than a transport fault
    pub fn is_decode_error(&self) -> bool {
        matches!(self, MeshError::DeserializationFailed { .. })
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for MeshError {
    fn from(err: redis::RedisError) -> Self {
        MeshError::BackendError(err.to_string())
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(err: serde_json::Error) -> Self {
        MeshError::SerializationFailed(err.to_string())
    }
}
