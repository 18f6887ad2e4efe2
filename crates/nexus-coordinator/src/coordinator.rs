//! Command routing and result correlation
//!
//! ```text
//! route_command ──publish──▶ agent_commands:<id> ──▶ agent
//!       │                                             │
//!   pending[request_id]                               ▼
//!       │                                    orchestrator_inbox
//!       ▼                                             │
//!   completed[request_id] ◀──── inbox listener ◀──────┘
//! ```
//!
//! Routing is fire-and-forget: `route_command` returns once the publish
//! completes. Outcomes are picked up later by the inbox listener. Commands
//! that never get an answer are expired oldest first once the pending set
//! reaches its capacity.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use nexus_mesh::{
    AgentId, AgentIdentity, Bus, Channel, Envelope, MessageType, ORCHESTRATOR_SENDER_ID, Payload,
    shutdown_requested,
};
use nexus_tools::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{CoordinatorConfig, DEFAULT_COMPLETED_CAPACITY, DEFAULT_PENDING_CAPACITY};
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::record::AgentStatusRecord;
use crate::registry::AgentRegistry;

/// Inbox events kept for inspection
const INBOX_EVENT_CAPACITY: usize = 256;

/// Acknowledgement that a command was published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteReceipt {
    pub request_id: String,
    pub agent_id: AgentId,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
}

/// A command published but not yet answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommand {
    pub request_id: String,
    pub agent_id: AgentId,
    pub tool_name: String,
    pub sent_at: DateTime<Utc>,
    #[serde(skip)]
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Result,
    Error,
    /// Pushed out of the pending set before any reply arrived
    Expired,
}

/// The agent's answer to a routed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub request_id: String,
    pub agent_id: String,
    pub tool_name: String,
    pub kind: OutcomeKind,
    pub payload: Payload,
    pub sent_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Where a command stands, as reported by `GET /commands/{request_id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandStatus {
    Pending { command: PendingCommand },
    Completed { outcome: CommandOutcome },
}

/// An inbox envelope that did not complete a pending command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboxEvent {
    pub sender_id: String,
    pub message_type: MessageType,
    pub payload: Payload,
    pub received_at: DateTime<Utc>,
}

/// Outcomes in completion order, evicting the oldest past `capacity`
#[derive(Debug)]
struct CompletedResults {
    capacity: usize,
    order: VecDeque<String>,
    outcomes: HashMap<String, CommandOutcome>,
}

impl CompletedResults {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            outcomes: HashMap::new(),
        }
    }

    fn insert(&mut self, outcome: CommandOutcome) {
        if self.outcomes.contains_key(&outcome.request_id) {
            self.order.retain(|id| id != &outcome.request_id);
        }
        self.order.push_back(outcome.request_id.clone());
        self.outcomes.insert(outcome.request_id.clone(), outcome);

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.outcomes.remove(&evicted);
            }
        }
    }

    fn get(&self, request_id: &str) -> Option<&CommandOutcome> {
        self.outcomes.get(request_id)
    }
}

/// The Nexus coordinator: agent registry plus command routing over the bus
pub struct Coordinator {
    registry: Arc<AgentRegistry>,
    bus: Arc<dyn Bus>,
    active_threshold: chrono::Duration,
    pending: RwLock<HashMap<String, PendingCommand>>,
    pending_capacity: usize,
    completed: RwLock<CompletedResults>,
    inbox_events: RwLock<VecDeque<InboxEvent>>,
    completion: Notify,
    next_seq: AtomicU64,
}

impl Coordinator {
    pub fn new(registry: Arc<AgentRegistry>, bus: Arc<dyn Bus>) -> Self {
        Self {
            registry,
            bus,
            active_threshold: CoordinatorConfig::default().active_threshold(),
            pending: RwLock::new(HashMap::new()),
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            completed: RwLock::new(CompletedResults::new(DEFAULT_COMPLETED_CAPACITY)),
            inbox_events: RwLock::new(VecDeque::new()),
            completion: Notify::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Apply the threshold and capacity settings from `config`
    pub fn with_config(mut self, config: &CoordinatorConfig) -> Self {
        self.active_threshold = config.active_threshold();
        self.pending_capacity = config.pending_capacity.max(1);
        self.completed = RwLock::new(CompletedResults::new(config.completed_capacity));
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    /// Threshold used when a caller does not give one
    pub fn active_threshold(&self) -> chrono::Duration {
        self.active_threshold
    }

    pub async fn register(&self, identity: AgentIdentity) -> CoordinatorResult<AgentStatusRecord> {
        Ok(self.registry.register(identity).await?)
    }

    /// Record a heartbeat and announce it on `agent_heartbeats`
    pub async fn heartbeat(&self, agent_id: &AgentId) -> CoordinatorResult<AgentStatusRecord> {
        let record = self.registry.heartbeat(agent_id).await?;

        let mut payload = Payload::new();
        payload.insert("agent_id".into(), json!(record.agent_id));
        payload.insert("status".into(), json!(record.status));
        payload.insert("last_heartbeat".into(), json!(record.last_heartbeat));
        let announcement = Envelope::status_update(ORCHESTRATOR_SENDER_ID, payload);

        if let Err(e) = self
            .bus
            .publish(&Channel::agent_heartbeats(), &announcement)
            .await
        {
            warn!(agent_id = %agent_id, error = %e, "Failed to announce heartbeat");
        }
        Ok(record)
    }

    /// Sweep stale agents offline and list the rest; see [`AgentRegistry::list_active`]
    pub async fn list_active(
        &self,
        threshold: Option<chrono::Duration>,
    ) -> CoordinatorResult<Vec<AgentStatusRecord>> {
        let threshold = threshold.unwrap_or(self.active_threshold);
        Ok(self.registry.list_active(threshold).await?)
    }

    pub async fn list_all(&self) -> CoordinatorResult<Vec<AgentStatusRecord>> {
        Ok(self.registry.list_all().await?)
    }

    pub async fn agent(&self, agent_id: &AgentId) -> CoordinatorResult<AgentStatusRecord> {
        self.registry
            .get(agent_id)
            .await?
            .ok_or_else(|| CoordinatorError::AgentNotFound(agent_id.clone()))
    }

    /// Publish a tool call to an agent's command channel
    ///
    /// The agent does not have to exist; the bus does not check for
    /// subscribers. Returns as soon as the publish completes.
    ///
    /// # Errors
    ///
    /// `DuplicateRequest` if the call's `request_id` is already pending,
    /// `Bus` if the publish fails (the pending entry is withdrawn).
    ///
    /// At capacity, the oldest pending command is completed as
    /// [`OutcomeKind::Expired`] to make room.
    pub async fn route_command(
        &self,
        agent_id: &AgentId,
        mut call: ToolCall,
    ) -> CoordinatorResult<RouteReceipt> {
        let request_id = call
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        call.request_id = Some(request_id.clone());

        let channel = Channel::agent_commands(agent_id);
        let sent_at = Utc::now();

        // Registered before publishing so a fast reply always finds it
        {
            let mut pending = self.pending.write().await;
            if pending.contains_key(&request_id) {
                return Err(CoordinatorError::DuplicateRequest(request_id));
            }
            pending.insert(
                request_id.clone(),
                PendingCommand {
                    request_id: request_id.clone(),
                    agent_id: agent_id.clone(),
                    tool_name: call.tool_name.clone(),
                    sent_at,
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                },
            );

            let expired = evict_oldest(&mut pending, self.pending_capacity);
            if !expired.is_empty() {
                let mut completed = self.completed.write().await;
                for command in expired {
                    warn!(
                        agent_id = %command.agent_id,
                        request_id = %command.request_id,
                        "Pending limit reached, expiring unanswered command"
                    );
                    completed.insert(expired_outcome(command));
                }
                drop(completed);
                self.completion.notify_waiters();
            }
        }

        let envelope = Envelope::tool_command(ORCHESTRATOR_SENDER_ID, call.to_payload());
        if let Err(e) = self.bus.publish(&channel, &envelope).await {
            self.pending.write().await.remove(&request_id);
            error!(agent_id = %agent_id, request_id = %request_id, error = %e, "Failed to route command");
            return Err(e.into());
        }

        info!(
            agent_id = %agent_id,
            request_id = %request_id,
            tool_name = %call.tool_name,
            "Command routed"
        );
        Ok(RouteReceipt {
            request_id,
            agent_id: agent_id.clone(),
            channel: channel.to_string(),
            sent_at,
        })
    }

    /// Publish an arbitrary envelope on a channel
    pub async fn publish_to_channel(
        &self,
        channel: &Channel,
        envelope: &Envelope,
    ) -> CoordinatorResult<()> {
        self.bus.publish(channel, envelope).await?;
        debug!(channel = %channel, message_type = %envelope.message_type, "Envelope published");
        Ok(())
    }

    pub async fn outcome(&self, request_id: &str) -> Option<CommandOutcome> {
        self.completed.read().await.get(request_id).cloned()
    }

    /// Outstanding commands, oldest first
    pub async fn pending(&self) -> Vec<PendingCommand> {
        let mut pending: Vec<_> = self.pending.read().await.values().cloned().collect();
        pending.sort_by_key(|p| p.seq);
        pending
    }

    pub async fn command_status(&self, request_id: &str) -> CoordinatorResult<CommandStatus> {
        if let Some(outcome) = self.outcome(request_id).await {
            return Ok(CommandStatus::Completed { outcome });
        }
        match self.pending.read().await.get(request_id) {
            Some(command) => Ok(CommandStatus::Pending {
                command: command.clone(),
            }),
            None => Err(CoordinatorError::CommandNotFound(request_id.to_string())),
        }
    }

    /// Wait up to `timeout` for a command to complete
    ///
    /// Returns `None` on timeout, or at once if the request id is neither
    /// pending nor completed.
    pub async fn await_outcome(&self, request_id: &str, timeout: Duration) -> Option<CommandOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.completion.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.outcome(request_id).await {
                return Some(outcome);
            }
            if !self.pending.read().await.contains_key(request_id) {
                return None;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Inbox envelopes that completed nothing, oldest first
    pub async fn inbox_events(&self) -> Vec<InboxEvent> {
        self.inbox_events.read().await.iter().cloned().collect()
    }

    /// Subscribe to `orchestrator_inbox` and process it until shutdown
    ///
    /// The subscription is open when this returns, so replies published
    /// afterwards are never missed.
    pub async fn spawn_inbox_listener(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> CoordinatorResult<JoinHandle<()>> {
        let inbox = Channel::orchestrator_inbox();
        let mut subscription = self.bus.subscribe(&inbox).await?;
        info!(channel = %inbox, "Inbox listener started");

        let coordinator = Arc::clone(self);
        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => break,
                    item = subscription.next() => match item {
                        Some(Ok(envelope)) => coordinator.handle_inbox_envelope(envelope).await,
                        Some(Err(e)) if e.is_decode_error() => {
                            warn!(error = %e, "Dropping malformed inbox envelope");
                        }
                        Some(Err(e)) => error!(error = %e, "Error receiving from inbox"),
                        None => {
                            warn!("Inbox stream ended");
                            break;
                        }
                    },
                }
            }

            if let Err(e) = coordinator.bus.unsubscribe(subscription).await {
                warn!(error = %e, "Failed to release inbox subscription");
            }
            info!("Inbox listener stopped");
        }))
    }

    /// Correlate one inbox envelope with its pending command
    pub async fn handle_inbox_envelope(&self, envelope: Envelope) {
        let kind = match envelope.message_type {
            MessageType::Result => OutcomeKind::Result,
            MessageType::Error => OutcomeKind::Error,
            other => {
                debug!(sender_id = %envelope.sender_id, message_type = %other, "Inbox event");
                self.record_event(envelope).await;
                return;
            }
        };

        let Some(command) = self.take_pending(&envelope).await else {
            warn!(
                sender_id = %envelope.sender_id,
                request_id = envelope.request_id().unwrap_or(""),
                "Reply matches no pending command"
            );
            self.record_event(envelope).await;
            return;
        };

        let outcome = CommandOutcome {
            request_id: command.request_id,
            agent_id: envelope.sender_id,
            tool_name: command.tool_name,
            kind,
            payload: envelope.payload,
            sent_at: command.sent_at,
            completed_at: Utc::now(),
        };
        info!(
            agent_id = %outcome.agent_id,
            request_id = %outcome.request_id,
            kind = ?outcome.kind,
            "Command completed"
        );

        self.completed.write().await.insert(outcome);
        self.completion.notify_waiters();
    }

    /// Remove the command a reply answers: by `request_id`, else the
    /// sender's oldest outstanding command
    async fn take_pending(&self, envelope: &Envelope) -> Option<PendingCommand> {
        let mut pending = self.pending.write().await;

        if let Some(request_id) = envelope.request_id() {
            let command = pending.get(request_id)?;
            if command.agent_id.as_str() != envelope.sender_id {
                warn!(
                    sender_id = %envelope.sender_id,
                    agent_id = %command.agent_id,
                    request_id = %request_id,
                    "Reply sender is not the agent the command was routed to"
                );
                return None;
            }
            return pending.remove(request_id);
        }

        let oldest = pending
            .values()
            .filter(|p| p.agent_id.as_str() == envelope.sender_id)
            .min_by_key(|p| p.seq)
            .map(|p| p.request_id.clone())?;
        pending.remove(&oldest)
    }

    async fn record_event(&self, envelope: Envelope) {
        let mut events = self.inbox_events.write().await;
        events.push_back(InboxEvent {
            sender_id: envelope.sender_id,
            message_type: envelope.message_type,
            payload: envelope.payload,
            received_at: Utc::now(),
        });
        while events.len() > INBOX_EVENT_CAPACITY {
            events.pop_front();
        }
    }

    /// Sweep stale agents offline every `interval` until shutdown
    pub fn spawn_reaper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Liveness reaper started");

            loop {
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => break,
                    _ = ticker.tick() => {
                        match coordinator.registry.sweep(coordinator.active_threshold).await {
                            Ok(demoted) if !demoted.is_empty() => {
                                info!(count = demoted.len(), "Reaper demoted stale agents");
                            }
                            Ok(_) => {}
                            Err(e) => error!(error = %e, "Reaper sweep failed"),
                        }
                    }
                }
            }
            info!("Liveness reaper stopped");
        })
    }
}

/// Remove the oldest entries until `pending` is within `capacity`
fn evict_oldest(
    pending: &mut HashMap<String, PendingCommand>,
    capacity: usize,
) -> Vec<PendingCommand> {
    let mut evicted = Vec::new();
    while pending.len() > capacity {
        let Some(oldest) = pending
            .values()
            .min_by_key(|p| p.seq)
            .map(|p| p.request_id.clone())
        else {
            break;
        };
        if let Some(command) = pending.remove(&oldest) {
            evicted.push(command);
        }
    }
    evicted
}

fn expired_outcome(command: PendingCommand) -> CommandOutcome {
    let mut payload = Payload::new();
    payload.insert(
        "error".into(),
        json!(format!(
            "No reply from {} before the command expired",
            command.agent_id
        )),
    );
    CommandOutcome {
        request_id: command.request_id,
        agent_id: command.agent_id.to_string(),
        tool_name: command.tool_name,
        kind: OutcomeKind::Expired,
        payload,
        sent_at: command.sent_at,
        completed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_mesh::InMemoryBus;

    fn outcome(id: &str) -> CommandOutcome {
        CommandOutcome {
            request_id: id.into(),
            agent_id: "a".into(),
            tool_name: "t".into(),
            kind: OutcomeKind::Result,
            payload: Payload::new(),
            sent_at: Utc::now(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_completed_results_evict_oldest() {
        let mut completed = CompletedResults::new(2);
        completed.insert(outcome("r1"));
        completed.insert(outcome("r2"));
        completed.insert(outcome("r3"));

        assert!(completed.get("r1").is_none());
        assert!(completed.get("r2").is_some());
        assert!(completed.get("r3").is_some());
    }

    #[tokio::test]
    async fn test_reply_without_request_id_completes_oldest_for_sender() {
        let coordinator = Coordinator::new(
            Arc::new(AgentRegistry::default()),
            Arc::new(InMemoryBus::new()),
        );
        let agent = AgentId::parse("gpt-agent_comms-001").unwrap();

        let first = coordinator
            .route_command(&agent, ToolCall::new("send_communication"))
            .await
            .unwrap();
        let second = coordinator
            .route_command(&agent, ToolCall::new("send_communication"))
            .await
            .unwrap();

        coordinator
            .handle_inbox_envelope(Envelope::result("gpt-agent_comms-001", Payload::new()))
            .await;

        assert!(coordinator.outcome(&first.request_id).await.is_some());
        let pending = coordinator.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, second.request_id);
    }

    #[tokio::test]
    async fn test_status_updates_are_kept_as_events() {
        let coordinator = Coordinator::new(
            Arc::new(AgentRegistry::default()),
            Arc::new(InMemoryBus::new()),
        );
        coordinator
            .handle_inbox_envelope(Envelope::status_update("agent-x", Payload::new()))
            .await;

        let events = coordinator.inbox_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message_type, MessageType::StatusUpdate);
    }
}
