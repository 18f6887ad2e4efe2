//! HTTP router configuration

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::coordinator::Coordinator;
use crate::http::handlers::{
    get_agent, get_command, health_check, heartbeat, list_active_agents, list_agents,
    publish_to_channel, register_agent, route_command,
};

/// Build the coordinator API
pub fn router(coordinator: Arc<Coordinator>, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/agents", get(list_agents))
        .route("/agents/register", post(register_agent))
        .route("/agents/heartbeat", post(heartbeat))
        .route("/agents/active", get(list_active_agents))
        .route("/agents/{agent_id}", get(get_agent))
        .route("/agents/{agent_id}/commands", post(route_command))
        .route("/channels/{channel}/publish", post(publish_to_channel))
        .route("/commands/{request_id}", get(get_command))
        .with_state(coordinator)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
