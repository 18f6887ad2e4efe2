//! Direct agent-to-coordinator channel (registration and heartbeats)

use async_trait::async_trait;
use nexus_mesh::{AgentId, AgentIdentity};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::ClientError;

/// Registration endpoint, relative to the coordinator base URL
pub const REGISTER_PATH: &str = "agents/register";
/// Heartbeat endpoint, relative to the coordinator base URL
pub const HEARTBEAT_PATH: &str = "agents/heartbeat";

/// Calls an agent makes to the coordinator outside the bus
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    /// Announce the agent, creating or refreshing its registry record
    async fn register(&self, identity: &AgentIdentity) -> Result<(), ClientError>;

    /// Report that the agent is still alive
    async fn heartbeat(&self, agent_id: &AgentId) -> Result<(), ClientError>;
}

/// [`CoordinatorClient`] over the coordinator's JSON HTTP API
#[derive(Debug, Clone)]
pub struct HttpCoordinatorClient {
    base_url: Url,
    http: Client,
}

impl HttpCoordinatorClient {
    /// Create a client whose every request gives up after `timeout`
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("nexus-agent/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ClientError::ConnectionError(format!("Failed to create HTTP client: {}", e))
            })?;
        Self::with_http_client(base_url, http)
    }

    /// Create a client around an existing reqwest client
    pub fn with_http_client(base_url: impl AsRef<str>, http: Client) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url.as_ref())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url.as_ref(), e)))?;

        // Relative joins replace the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("Invalid endpoint path: {}", e)))
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), ClientError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "Calling coordinator");

        let response = self.http.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinatorClient for HttpCoordinatorClient {
    async fn register(&self, identity: &AgentIdentity) -> Result<(), ClientError> {
        self.post_json(REGISTER_PATH, identity).await
    }

    async fn heartbeat(&self, agent_id: &AgentId) -> Result<(), ClientError> {
        self.post_json(HEARTBEAT_PATH, &json!({ "agent_id": agent_id }))
            .await
    }
}
