//! The coordinator's JSON HTTP API

pub mod handlers;
pub mod router;

pub use handlers::{ActiveQuery, AgentsListResponse, HeartbeatRequest};
pub use router::router;
