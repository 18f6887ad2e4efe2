//! # Nexus Mesh
//!
//! Publish/subscribe transport shared by the Nexus coordinator and its agents.
//!
//! The coordinator publishes `tool_command` envelopes on each agent's
//! `agent_commands:<agent_id>` channel; agents reply on the shared
//! `orchestrator_inbox`. Two backends implement [`Bus`]:
//!
//! - [`InMemoryBus`]: tokio broadcast channels, for single-process setups and tests
//! - `RedisBus`: Redis PUBLISH/SUBSCRIBE (feature `redis`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use nexus_mesh::{AgentId, Channel, Envelope, Payload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = nexus_mesh::connect("memory://").await?;
//!     let agent = AgentId::parse("gpt-agent_research-001")?;
//!
//!     let command = Envelope::tool_command("orchestrator", Payload::new());
//!     bus.publish(&Channel::agent_commands(&agent), &command).await?;
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod memory;
pub mod shutdown;
pub mod types;

#[cfg(feature = "redis")]
pub mod redis;

pub use bus::{Bus, EnvelopeStream, MEMORY_SCHEME, Subscription, connect};
pub use envelope::{ERROR_KEY, Envelope, MessageType, Payload, REQUEST_ID_KEY};
pub use error::{MeshError, MeshResult};
pub use identity::AgentIdentity;
pub use memory::InMemoryBus;
pub use shutdown::{shutdown_requested, shutdown_signal};
pub use types::{AgentId, Channel, IdValidationError, ORCHESTRATOR_SENDER_ID};

#[cfg(feature = "redis")]
pub use self::redis::{RedisBus, RedisConfig};
