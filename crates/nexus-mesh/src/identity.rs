use crate::types::AgentId;
use serde::{Deserialize, Serialize};

/// Who an agent is, fixed for the life of the process.
///
/// Serializes as the registration body the coordinator expects:
/// `{"agent_id", "agent_name", "agent_type", "capabilities"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub agent_type: String,
    #[serde(default)]
    pub capabilities: String,
}

impl AgentIdentity {
    pub fn new(agent_id: AgentId, agent_name: impl Into<String>, agent_type: impl Into<String>) -> Self {
        Self {
            agent_id,
            agent_name: agent_name.into(),
            agent_type: agent_type.into(),
            capabilities: String::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.capabilities = capabilities.into();
        self
    }
}
