//! # Nexus
//!
//! A coordinator that tracks a fleet of worker agents and routes tool commands
//! to them over a publish/subscribe bus.
//!
//! - [`mesh`]: the bus, its channels and the envelope wire format
//! - [`tools`]: the tool interface, registry, dispatcher and stock tools
//! - [`agent`]: the agent run loop and the stock agent profiles
//! - [`coordinator`]: the agent registry, command routing and HTTP API

pub use nexus_agent as agent;
pub use nexus_coordinator as coordinator;
pub use nexus_mesh as mesh;
pub use nexus_tools as tools;

pub use nexus_agent::{AgentProfile, AgentRuntime, AgentState};
pub use nexus_coordinator::{AgentRegistry, Coordinator};
pub use nexus_mesh::{AgentId, AgentIdentity, Bus, Channel, Envelope, MessageType};
pub use nexus_tools::{CommandDispatcher, Tool, ToolCall};
