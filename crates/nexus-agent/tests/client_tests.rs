//! HttpCoordinatorClient against a mock coordinator

use nexus_agent::{AgentIdentity, ClientError, CoordinatorClient, HttpCoordinatorClient};
use nexus_mesh::AgentId;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn identity() -> AgentIdentity {
    AgentIdentity::new(
        AgentId::parse("gpt-agent_research-001").unwrap(),
        "Research Agent Prime",
        "research",
    )
    .with_capabilities("Simulated web research, internal document lookup")
}

#[tokio::test]
async fn test_register_posts_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agents/register"))
        .and(body_json(json!({
            "agent_id": "gpt-agent_research-001",
            "agent_name": "Research Agent Prime",
            "agent_type": "research",
            "capabilities": "Simulated web research, internal document lookup",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "online"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCoordinatorClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    client.register(&identity()).await.unwrap();
}

#[tokio::test]
async fn test_heartbeat_posts_agent_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agents/heartbeat"))
        .and(body_json(json!({"agent_id": "gpt-agent_research-001"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCoordinatorClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    client
        .heartbeat(&AgentId::parse("gpt-agent_research-001").unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_heartbeat_for_unknown_agent_reports_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agents/heartbeat"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "agent_not_found",
            "message": "Agent 'ghost' not found",
        })))
        .mount(&server)
        .await;

    let client = HttpCoordinatorClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = client
        .heartbeat(&AgentId::parse("ghost").unwrap())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    match err {
        ClientError::UnexpectedStatus { body, .. } => assert!(body.contains("agent_not_found")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_slow_coordinator_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agents/register"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = HttpCoordinatorClient::new(server.uri(), Duration::from_millis(200)).unwrap();
    let err = client.register(&identity()).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_coordinator_is_connection_error() {
    // Port 9 (discard) is not expected to have an HTTP server
    let client = HttpCoordinatorClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
    let err = client.register(&identity()).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::ConnectionError(_) | ClientError::Timeout(_)
    ));
}
