//! Error types for the agent process.

use nexus_mesh::{IdValidationError, MeshError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors talking to the coordinator over its direct HTTP channel.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The coordinator URL could not be parsed or joined.
    #[error("Invalid coordinator URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete within the configured timeout.
    #[error("Request to coordinator timed out: {0}")]
    Timeout(String),

    /// The request could not be sent or the connection dropped.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The coordinator answered with a non-success status.
    #[error("Coordinator returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl ClientError {
    /// Whether the coordinator rejected the request because the agent is unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::UnexpectedStatus { status: 404, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else {
            ClientError::ConnectionError(err.to_string())
        }
    }
}

/// Errors that stop the agent run loop.
#[derive(Debug, Error)]
pub enum AgentRuntimeError {
    /// The bus could not be reached while starting.
    #[error("Bus unavailable: {0}")]
    BusUnavailable(#[source] MeshError),

    /// The command channel subscription could not be opened.
    #[error("Failed to subscribe to command channel: {0}")]
    SubscribeFailed(#[source] MeshError),

    /// The agent identity did not hold a valid id.
    #[error("Invalid agent identity: {0}")]
    InvalidIdentity(#[from] IdValidationError),

    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The coordinator client could not be built.
    #[error(transparent)]
    Client(#[from] ClientError),
}
