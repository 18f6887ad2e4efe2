//! # Nexus Agent
//!
//! The process that hosts one agent: it registers with the coordinator,
//! heartbeats on an interval and serves `tool_command` envelopes from its
//! `agent_commands:<agent_id>` channel until told to stop.
//!
//! ```rust,no_run
//! use nexus_agent::{AgentConfig, AgentProfile};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::from_env()?;
//!     let runtime = AgentProfile::Research.runtime(&config).await?;
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     runtime.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod profile;
pub mod runtime;

pub use client::{CoordinatorClient, HEARTBEAT_PATH, HttpCoordinatorClient, REGISTER_PATH};
pub use config::{AgentConfig, ConfigError};
pub use error::{AgentRuntimeError, ClientError};
pub use nexus_mesh::AgentIdentity;
pub use profile::AgentProfile;
pub use runtime::{AgentRuntime, AgentState};
