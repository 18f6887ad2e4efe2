//! # Nexus Coordinator
//!
//! Tracks the agent fleet and routes tool commands to it.
//!
//! - [`AgentRegistry`]: registration, heartbeats and the liveness sweep
//! - [`Coordinator`]: command routing over the bus and reply correlation
//! - [`http::router`]: the JSON API agents and operators talk to
//!
//! ```rust,no_run
//! use nexus_coordinator::{AgentRegistry, Coordinator, CoordinatorConfig, http};
//! use nexus_mesh::shutdown_signal;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CoordinatorConfig::from_env()?;
//!     let bus = nexus_mesh::connect(&config.bus_url).await?;
//!     let coordinator = Arc::new(
//!         Coordinator::new(Arc::new(AgentRegistry::default()), bus).with_config(&config),
//!     );
//!
//!     let (_stop_tx, stop_rx) = watch::channel(false);
//!     coordinator.spawn_inbox_listener(stop_rx).await?;
//!
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//!     axum::serve(listener, http::router(coordinator, config.enable_cors))
//!         .with_graceful_shutdown(shutdown_signal())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod record;
pub mod registry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::{
    CommandOutcome, CommandStatus, Coordinator, InboxEvent, OutcomeKind, PendingCommand,
    RouteReceipt,
};
pub use error::{CoordinatorError, CoordinatorResult, ErrorResponse};
pub use record::{AgentStatus, AgentStatusRecord};
pub use registry::{AgentRegistry, RegistryError, RegistryEvent};
pub use store::{AgentStore, InMemoryAgentStore, StoreError};
