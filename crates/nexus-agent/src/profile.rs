//! The stock agent fleet
//!
//! Each profile pins an identity and the tools it serves. Building a runtime
//! from a profile wires in the bus, the coordinator client and the dispatcher
//! described by an [`AgentConfig`].

use nexus_mesh::{AgentId, AgentIdentity, IdValidationError};
use nexus_tools::standard::{ExecuteShellCommand, PerformResearch, PlanTask, SendCommunication};
use nexus_tools::{CommandDispatcher, InMemoryToolRegistry};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::client::HttpCoordinatorClient;
use crate::config::AgentConfig;
use crate::error::AgentRuntimeError;
use crate::runtime::AgentRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentProfile {
    Research,
    OpsExecution,
    Comms,
    Strategy,
}

impl AgentProfile {
    pub const ALL: [AgentProfile; 4] = [
        AgentProfile::Research,
        AgentProfile::OpsExecution,
        AgentProfile::Comms,
        AgentProfile::Strategy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentProfile::Research => "research",
            AgentProfile::OpsExecution => "ops_execution",
            AgentProfile::Comms => "comms",
            AgentProfile::Strategy => "strategy",
        }
    }

    fn agent_name(&self) -> &'static str {
        match self {
            AgentProfile::Research => "Research Agent Prime",
            AgentProfile::OpsExecution => "Operations Execution Agent Prime",
            AgentProfile::Comms => "Communication Agent Prime",
            AgentProfile::Strategy => "Strategy Agent Prime",
        }
    }

    fn capabilities(&self) -> &'static str {
        match self {
            AgentProfile::Research => "Simulated web research, internal document lookup",
            AgentProfile::OpsExecution => "Execute safe shell commands, list files",
            AgentProfile::Comms => "Send SMS, Email, Real-time Chat",
            AgentProfile::Strategy => "Task planning, request analysis",
        }
    }

    /// The fixed id this profile registers under
    pub fn agent_id(&self) -> Result<AgentId, IdValidationError> {
        AgentId::parse(format!("gpt-agent_{}-001", self.as_str()))
    }

    pub fn identity(&self) -> Result<AgentIdentity, IdValidationError> {
        Ok(
            AgentIdentity::new(self.agent_id()?, self.agent_name(), self.as_str())
                .with_capabilities(self.capabilities()),
        )
    }

    /// Tools served by this profile; research reads documents from `docs_dir`
    pub fn tool_registry(&self, docs_dir: &Path) -> InMemoryToolRegistry {
        let registry = InMemoryToolRegistry::new();
        match self {
            AgentProfile::Research => registry.with_tool(Arc::new(PerformResearch::new(docs_dir))),
            AgentProfile::OpsExecution => registry.with_tool(Arc::new(ExecuteShellCommand)),
            AgentProfile::Comms => registry.with_tool(Arc::new(SendCommunication)),
            AgentProfile::Strategy => registry.with_tool(Arc::new(PlanTask)),
        }
    }

    pub fn dispatcher(&self, config: &AgentConfig) -> CommandDispatcher {
        CommandDispatcher::new(Arc::new(self.tool_registry(&config.docs_dir)))
            .with_policy(config.argument_policy)
    }

    /// Connect to the configured bus and coordinator and assemble a runtime
    ///
    /// # Errors
    ///
    /// `BusUnavailable` if the bus URL cannot be connected to, `Client` if the
    /// coordinator URL is invalid, `Config` if `config` fails validation.
    pub async fn runtime(&self, config: &AgentConfig) -> Result<AgentRuntime, AgentRuntimeError> {
        config.validate()?;
        let identity = self.identity()?;

        let bus = nexus_mesh::connect(&config.bus_url)
            .await
            .map_err(AgentRuntimeError::BusUnavailable)?;
        let client = HttpCoordinatorClient::new(&config.coordinator_url, config.request_timeout)?;

        info!(
            profile = %self,
            bus_url = %config.bus_url,
            coordinator_url = %config.coordinator_url,
            policy = %config.argument_policy,
            "Agent runtime assembled"
        );

        Ok(AgentRuntime::new(
            identity,
            bus,
            Arc::new(client),
            self.dispatcher(config),
        )
        .with_heartbeat_interval(config.heartbeat_interval))
    }
}

impl fmt::Display for AgentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        AgentProfile::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown agent profile '{}', expected one of: research, ops_execution, comms, strategy",
                    s
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_tools::ToolRegistry;

    #[test]
    fn test_profile_identities() {
        let identity = AgentProfile::OpsExecution.identity().unwrap();
        assert_eq!(identity.agent_id.as_str(), "gpt-agent_ops_execution-001");
        assert_eq!(identity.agent_name, "Operations Execution Agent Prime");
        assert_eq!(identity.agent_type, "ops_execution");
        assert_eq!(identity.capabilities, "Execute safe shell commands, list files");

        assert_eq!(
            AgentProfile::Research.agent_id().unwrap().as_str(),
            "gpt-agent_research-001"
        );
    }

    #[test]
    fn test_each_profile_serves_one_tool() {
        let docs = Path::new("/tmp");
        let expected = [
            (AgentProfile::Research, "perform_research"),
            (AgentProfile::OpsExecution, "execute_shell_command"),
            (AgentProfile::Comms, "send_communication"),
            (AgentProfile::Strategy, "plan_task"),
        ];
        for (profile, tool) in expected {
            assert_eq!(profile.tool_registry(docs).tool_names(), vec![tool]);
        }
    }

    #[test]
    fn test_parse_profile() {
        assert_eq!(
            "ops-execution".parse::<AgentProfile>().unwrap(),
            AgentProfile::OpsExecution
        );
        assert_eq!(
            " Strategy ".parse::<AgentProfile>().unwrap(),
            AgentProfile::Strategy
        );
        assert!("janitor".parse::<AgentProfile>().is_err());
    }

    #[tokio::test]
    async fn test_runtime_with_memory_bus() {
        let config = AgentConfig::default().with_bus_url("memory://");
        let runtime = AgentProfile::Comms.runtime(&config).await.unwrap();
        assert_eq!(runtime.identity().agent_type, "comms");
        assert_eq!(runtime.dispatcher().definitions().len(), 1);
    }

    #[tokio::test]
    async fn test_runtime_rejects_unknown_bus_scheme() {
        let config = AgentConfig::default().with_bus_url("carrier-pigeon://loft");
        let result = AgentProfile::Comms.runtime(&config).await;
        assert!(matches!(result, Err(AgentRuntimeError::BusUnavailable(_))));
    }
}
