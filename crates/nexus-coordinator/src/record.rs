//! What the coordinator knows about each agent

use chrono::{DateTime, Duration, Utc};
use nexus_mesh::{AgentId, AgentIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Online => "online",
            AgentStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-known state of one agent
///
/// `status` only turns `offline` through a liveness sweep and only turns
/// `online` again through registration or a heartbeat. `created_at` is set on
/// first registration and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusRecord {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub agent_type: String,
    #[serde(default)]
    pub capabilities: String,
    pub status: AgentStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AgentStatusRecord {
    /// First sighting of an agent
    pub fn new(identity: AgentIdentity, now: DateTime<Utc>) -> Self {
        Self {
            agent_id: identity.agent_id,
            agent_name: identity.agent_name,
            agent_type: identity.agent_type,
            capabilities: identity.capabilities,
            status: AgentStatus::Online,
            last_heartbeat: now,
            created_at: now,
        }
    }

    /// Re-registration: take the new identity fields, keep `created_at`
    pub fn reregister(&mut self, identity: AgentIdentity, now: DateTime<Utc>) {
        self.agent_name = identity.agent_name;
        self.agent_type = identity.agent_type;
        self.capabilities = identity.capabilities;
        self.touch(now);
    }

    /// Mark alive at `now`; the heartbeat never moves backwards
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat = self.last_heartbeat.max(now);
        self.status = AgentStatus::Online;
    }

    pub fn is_online(&self) -> bool {
        self.status == AgentStatus::Online
    }

    /// Whether the last heartbeat is older than `threshold` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.last_heartbeat > threshold
    }

    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity::new(
            self.agent_id.clone(),
            self.agent_name.clone(),
            self.agent_type.clone(),
        )
        .with_capabilities(self.capabilities.clone())
    }
}
