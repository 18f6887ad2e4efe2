//! # Nexus Tools
//!
//! The uniform tool interface agents expose over the bus, the registry that
//! holds an agent's tools, and the [`CommandDispatcher`] that turns a decoded
//! [`ToolCall`] into a reply payload.
//!
//! ```rust
//! use nexus_tools::{CommandDispatcher, InMemoryToolRegistry, ToolCall};
//! use nexus_tools::standard::PlanTask;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let registry = InMemoryToolRegistry::new().with_tool(Arc::new(PlanTask));
//! let dispatcher = CommandDispatcher::new(Arc::new(registry));
//!
//! let outcome = dispatcher
//!     .dispatch(&ToolCall::new("plan_task").with_argument("request", "list all agents"))
//!     .await;
//! assert!(outcome.is_completed());
//! # }
//! ```

pub mod call;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod standard;
pub mod tool;

pub use call::ToolCall;
pub use dispatcher::{
    ArgumentPolicy, CommandDispatcher, DispatchOutcome, PROCESSING_ERROR_PREFIX, error_payload,
};
pub use error::ToolError;
pub use registry::{InMemoryToolRegistry, ToolRegistry};
pub use tool::{
    ParameterSchema, ParameterType, SchemaType, Tool, ToolArguments, ToolDefinition,
    ToolParameters,
};
