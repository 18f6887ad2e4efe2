use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    CoordinatorConfig(#[from] nexus_coordinator::ConfigError),

    #[error(transparent)]
    AgentConfig(#[from] nexus_agent::ConfigError),

    #[error(transparent)]
    Coordinator(#[from] nexus_coordinator::CoordinatorError),

    #[error(transparent)]
    Agent(#[from] nexus_agent::AgentRuntimeError),

    #[error("Bus error: {0}")]
    Bus(#[from] nexus_mesh::MeshError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
