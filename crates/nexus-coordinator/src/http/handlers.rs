//! HTTP handlers for the coordinator API

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};
use nexus_mesh::{AgentId, AgentIdentity, Channel, Envelope};
use nexus_tools::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::coordinator::{CommandStatus, Coordinator, RouteReceipt};
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::record::AgentStatusRecord;

type AppState = State<Arc<Coordinator>>;

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    pub threshold_minutes: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentsListResponse {
    pub agents: Vec<AgentStatusRecord>,
    pub total: usize,
}

impl From<Vec<AgentStatusRecord>> for AgentsListResponse {
    fn from(agents: Vec<AgentStatusRecord>) -> Self {
        Self {
            total: agents.len(),
            agents,
        }
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> CoordinatorResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| CoordinatorError::InvalidRequest(format!("Invalid request body: {}", e.body_text())))
}

/// POST /agents/register - Register or re-register an agent
pub async fn register_agent(
    State(coordinator): AppState,
    payload: Result<Json<AgentIdentity>, JsonRejection>,
) -> CoordinatorResult<Json<AgentStatusRecord>> {
    let identity = body(payload)?;
    Ok(Json(coordinator.register(identity).await?))
}

/// POST /agents/heartbeat - Refresh an agent's liveness
pub async fn heartbeat(
    State(coordinator): AppState,
    payload: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> CoordinatorResult<Json<AgentStatusRecord>> {
    let request = body(payload)?;
    let agent_id = request
        .agent_id
        .ok_or_else(|| CoordinatorError::InvalidRequest("agent_id is required".to_string()))?;
    let agent_id = AgentId::parse(agent_id)?;
    Ok(Json(coordinator.heartbeat(&agent_id).await?))
}

/// GET /agents/active - Sweep stale agents offline and list the rest
pub async fn list_active_agents(
    State(coordinator): AppState,
    query: Result<Query<ActiveQuery>, QueryRejection>,
) -> CoordinatorResult<Json<AgentsListResponse>> {
    let Query(query) = query.map_err(|e| CoordinatorError::InvalidRequest(e.body_text()))?;
    let threshold = query
        .threshold_minutes
        .map(|m| chrono::Duration::minutes(i64::from(m)));
    Ok(Json(coordinator.list_active(threshold).await?.into()))
}

/// GET /agents - Every known agent, any status
pub async fn list_agents(
    State(coordinator): AppState,
) -> CoordinatorResult<Json<AgentsListResponse>> {
    Ok(Json(coordinator.list_all().await?.into()))
}

/// GET /agents/{agent_id} - One agent's record
pub async fn get_agent(
    State(coordinator): AppState,
    Path(agent_id): Path<String>,
) -> CoordinatorResult<Json<AgentStatusRecord>> {
    let agent_id = AgentId::parse(agent_id)?;
    Ok(Json(coordinator.agent(&agent_id).await?))
}

/// POST /agents/{agent_id}/commands - Route a tool call to an agent
pub async fn route_command(
    State(coordinator): AppState,
    Path(agent_id): Path<String>,
    payload: Result<Json<ToolCall>, JsonRejection>,
) -> CoordinatorResult<(StatusCode, Json<RouteReceipt>)> {
    let agent_id = AgentId::parse(agent_id)?;
    let call = body(payload)?;
    if call.tool_name.trim().is_empty() {
        return Err(CoordinatorError::InvalidRequest(
            "tool_name cannot be empty".to_string(),
        ));
    }
    let receipt = coordinator.route_command(&agent_id, call).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// POST /channels/{channel}/publish - Publish a raw envelope
pub async fn publish_to_channel(
    State(coordinator): AppState,
    Path(channel): Path<String>,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> CoordinatorResult<(StatusCode, Json<Value>)> {
    let channel = Channel::parse(channel)?;
    let envelope = body(payload)?;
    coordinator.publish_to_channel(&channel, &envelope).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "published", "channel": channel })),
    ))
}

/// GET /commands/{request_id} - Pending or completed command
pub async fn get_command(
    State(coordinator): AppState,
    Path(request_id): Path<String>,
) -> CoordinatorResult<Json<CommandStatus>> {
    Ok(Json(coordinator.command_status(&request_id).await?))
}

/// GET /health - Coordinator liveness
pub async fn health_check(State(coordinator): AppState) -> (StatusCode, Json<Value>) {
    let bus = match coordinator.bus().ping().await {
        Ok(()) => "reachable",
        Err(_) => "unreachable",
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "nexus-coordinator",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
            "bus": bus,
            "pending_commands": coordinator.pending().await.len(),
        })),
    )
}
