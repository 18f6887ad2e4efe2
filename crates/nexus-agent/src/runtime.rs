//! The agent run loop
//!
//! Every agent runs the same loop regardless of its tools:
//!
//! ```text
//! Starting ──ping ok──▶ Registering ──▶ Running ──shutdown──▶ Draining ──▶ Stopped
//!     │
//!     └──ping failed──▶ Stopped (BusUnavailable)
//! ```
//!
//! While `Running`, a heartbeat loop and the command loop run side by side.
//! Commands are handled one at a time in the order they arrive.

use futures::StreamExt;
use nexus_mesh::{
    AgentIdentity, Bus, Channel, Envelope, MessageType, Subscription, shutdown_requested,
};
use nexus_tools::{CommandDispatcher, DispatchOutcome, PROCESSING_ERROR_PREFIX, ToolCall};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::client::CoordinatorClient;
use crate::config::DEFAULT_HEARTBEAT_INTERVAL_SECS;
use crate::error::AgentRuntimeError;

/// Lifecycle state of an agent runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Starting,
    Registering,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentState::Starting => "starting",
            AgentState::Registering => "registering",
            AgentState::Running => "running",
            AgentState::Draining => "draining",
            AgentState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Hosts one agent: registration, heartbeats, and the command loop
pub struct AgentRuntime {
    identity: AgentIdentity,
    bus: Arc<dyn Bus>,
    client: Arc<dyn CoordinatorClient>,
    dispatcher: CommandDispatcher,
    heartbeat_interval: Duration,
    state: watch::Sender<AgentState>,
}

impl AgentRuntime {
    pub fn new(
        identity: AgentIdentity,
        bus: Arc<dyn Bus>,
        client: Arc<dyn CoordinatorClient>,
        dispatcher: CommandDispatcher,
    ) -> Self {
        let (state, _) = watch::channel(AgentState::Starting);
        Self {
            identity,
            bus,
            client,
            dispatcher,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            state,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Current lifecycle state
    pub fn state(&self) -> AgentState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: AgentState) {
        self.state.send_replace(next);
        debug!(agent_id = %self.identity.agent_id, state = %next, "Agent state changed");
    }

    /// Run until `shutdown` turns `true` (or its sender is dropped)
    ///
    /// Returns an error only when the bus is unreachable at start or the
    /// command channel cannot be subscribed. Everything after that is logged
    /// and the loop carries on.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), AgentRuntimeError> {
        let agent_id = &self.identity.agent_id;
        self.set_state(AgentState::Starting);

        if let Err(e) = self.bus.ping().await {
            error!(agent_id = %agent_id, error = %e, "Bus unreachable, agent cannot start");
            self.set_state(AgentState::Stopped);
            return Err(AgentRuntimeError::BusUnavailable(e));
        }

        self.set_state(AgentState::Registering);
        self.register().await;

        let commands = Channel::agent_commands(agent_id);
        let subscription = match self.bus.subscribe(&commands).await {
            Ok(subscription) => subscription,
            Err(e) => {
                error!(agent_id = %agent_id, channel = %commands, error = %e, "Subscribe failed");
                self.set_state(AgentState::Stopped);
                return Err(AgentRuntimeError::SubscribeFailed(e));
            }
        };

        self.set_state(AgentState::Running);
        info!(agent_id = %agent_id, channel = %commands, "Agent listening for commands");

        let (stop_heartbeat, heartbeat_stopped) = watch::channel(false);
        let heartbeat = self.heartbeat_loop(heartbeat_stopped);
        let commands_done = async move {
            let subscription = self.command_loop(subscription, shutdown).await;
            self.set_state(AgentState::Draining);
            if let Err(e) = self.bus.unsubscribe(subscription).await {
                warn!(agent_id = %agent_id, error = %e, "Unsubscribe failed");
            }
            stop_heartbeat.send_replace(true);
        };
        tokio::join!(heartbeat, commands_done);

        self.set_state(AgentState::Stopped);
        info!(agent_id = %agent_id, "Agent stopped");
        Ok(())
    }

    /// One best-effort registration; failures are logged and left to the
    /// next heartbeat
    async fn register(&self) {
        let agent_id = &self.identity.agent_id;
        match self.client.register(&self.identity).await {
            Ok(()) => info!(agent_id = %agent_id, "Agent registered"),
            Err(e) => warn!(agent_id = %agent_id, error = %e, "Registration failed, continuing"),
        }
    }

    async fn heartbeat_loop(&self, mut stop: watch::Receiver<bool>) {
        let agent_id = &self.identity.agent_id;
        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut stop) => break,
                _ = ticker.tick() => {
                    match self.client.heartbeat(agent_id).await {
                        Ok(()) => debug!(agent_id = %agent_id, "Heartbeat sent"),
                        Err(e) if e.is_not_found() => {
                            warn!(agent_id = %agent_id, "Coordinator does not know this agent, registering again");
                            self.register().await;
                        }
                        Err(e) => warn!(agent_id = %agent_id, error = %e, "Heartbeat failed"),
                    }
                }
            }
        }
    }

    /// Process commands until shutdown, handing the subscription back for release
    async fn command_loop(
        &self,
        mut subscription: Subscription,
        mut shutdown: watch::Receiver<bool>,
    ) -> Subscription {
        let agent_id = &self.identity.agent_id;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                item = subscription.next() => match item {
                    Some(Ok(envelope)) => {
                        let handling = self.handle_envelope(envelope);
                        tokio::pin!(handling);
                        tokio::select! {
                            _ = &mut handling => {}
                            _ = shutdown_requested(&mut shutdown) => {
                                self.set_state(AgentState::Draining);
                                info!(agent_id = %agent_id, "Shutdown requested, finishing in-flight command");
                                handling.await;
                                break;
                            }
                        }
                    }
                    Some(Err(e)) if e.is_decode_error() => {
                        warn!(agent_id = %agent_id, error = %e, "Dropping malformed envelope");
                    }
                    Some(Err(e)) => {
                        error!(agent_id = %agent_id, error = %e, "Error receiving from bus");
                    }
                    None => {
                        warn!(agent_id = %agent_id, "Command stream ended");
                        break;
                    }
                },
            }
        }

        subscription
    }

    /// Handle one envelope from the command channel
    ///
    /// Public so a host can drive the runtime without a bus loop.
    pub async fn handle_envelope(&self, envelope: Envelope) {
        let agent_id = &self.identity.agent_id;

        if envelope.message_type != MessageType::ToolCommand {
            warn!(
                agent_id = %agent_id,
                sender_id = %envelope.sender_id,
                message_type = %envelope.message_type,
                "Unhandled message type, dropping"
            );
            return;
        }

        debug!(agent_id = %agent_id, sender_id = %envelope.sender_id, "Received tool command");
        let reply = self.reply_to(&envelope).await;

        if let Err(e) = self.bus.publish(&Channel::orchestrator_inbox(), &reply).await {
            error!(agent_id = %agent_id, error = %e, "Failed to publish reply");
        } else {
            debug!(
                agent_id = %agent_id,
                message_type = %reply.message_type,
                request_id = reply.request_id().unwrap_or(""),
                "Reply published"
            );
        }
    }

    async fn reply_to(&self, envelope: &Envelope) -> Envelope {
        let sender = self.identity.agent_id.as_str();

        let (reply, request_id) = match ToolCall::from_payload(&envelope.payload) {
            Ok(call) => {
                let reply = match self.dispatcher.dispatch(&call).await {
                    DispatchOutcome::Completed(payload) => Envelope::result(sender, payload),
                    DispatchOutcome::Failed(payload) => {
                        Envelope::new(sender, MessageType::Error, payload)
                    }
                };
                (reply, call.request_id)
            }
            Err(e) => {
                warn!(agent_id = %sender, error = %e, "Tool command payload did not decode");
                let reply = Envelope::error(sender, format!("{}: {}", PROCESSING_ERROR_PREFIX, e));
                (reply, envelope.request_id().map(str::to_owned))
            }
        };

        match request_id {
            Some(id) => reply.with_request_id(id),
            None => reply,
        }
    }
}
