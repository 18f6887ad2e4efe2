//! Agent registry and liveness tracking
//!
//! Every mutation (register, heartbeat, sweep) runs under one mutex, so the
//! upsert and the offline sweep never interleave for the same agent. Reads
//! that do not sweep go straight to the store.

use chrono::{DateTime, Duration, Utc};
use nexus_mesh::{AgentId, AgentIdentity};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::record::{AgentStatus, AgentStatusRecord};
use crate::store::{AgentStore, InMemoryAgentStore, StoreError};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Agent '{0}' not found")]
    NotFound(AgentId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registry transitions, for observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    Registered { record: AgentStatusRecord },
    Heartbeat { agent_id: AgentId, at: DateTime<Utc> },
    WentOffline { agent_id: AgentId },
}

pub struct AgentRegistry {
    store: Arc<dyn AgentStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryAgentStore::new()), Arc::new(SystemClock))
    }
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn AgentStore>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Create or refresh an agent's record
    ///
    /// Re-registration is the normal reconnect path: identity fields are
    /// replaced, the agent goes back online and `created_at` is preserved.
    pub async fn register(
        &self,
        identity: AgentIdentity,
    ) -> Result<AgentStatusRecord, RegistryError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();

        let record = match self.store.get(&identity.agent_id).await? {
            Some(mut existing) => {
                existing.reregister(identity, now);
                existing
            }
            None => AgentStatusRecord::new(identity, now),
        };
        self.store.upsert(record.clone()).await?;

        info!(
            agent_id = %record.agent_id,
            agent_type = %record.agent_type,
            "Agent registered"
        );
        self.emit(RegistryEvent::Registered {
            record: record.clone(),
        });
        Ok(record)
    }

    /// Refresh a registered agent's liveness
    ///
    /// # Errors
    ///
    /// `NotFound` if the agent never registered; nothing is written.
    pub async fn heartbeat(&self, agent_id: &AgentId) -> Result<AgentStatusRecord, RegistryError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();

        let mut record = self
            .store
            .get(agent_id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(agent_id.clone()))?;
        record.touch(now);
        self.store.upsert(record.clone()).await?;

        debug!(agent_id = %agent_id, "Heartbeat recorded");
        self.emit(RegistryEvent::Heartbeat {
            agent_id: agent_id.clone(),
            at: record.last_heartbeat,
        });
        Ok(record)
    }

    /// Sweep stale agents offline, then list the ones still online
    ///
    /// This read mutates: any `online` record whose last heartbeat is older
    /// than `threshold` is flipped to `offline` before the list is built.
    /// Both halves run under the registry lock, so concurrent calls see a
    /// consistent result.
    pub async fn list_active(
        &self,
        threshold: Duration,
    ) -> Result<Vec<AgentStatusRecord>, RegistryError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();

        let (records, _) = self.sweep_locked(now, threshold).await?;
        let mut active: Vec<_> = records
            .into_iter()
            .filter(|r| r.is_online() && !r.is_stale(now, threshold))
            .collect();
        active.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(active)
    }

    /// Demote stale agents, returning the ids that went offline
    pub async fn sweep(&self, threshold: Duration) -> Result<Vec<AgentId>, RegistryError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();

        let (_, demoted) = self.sweep_locked(now, threshold).await?;
        Ok(demoted)
    }

    /// Caller holds `write_lock`. Returns every record after the sweep and
    /// the ids it demoted.
    async fn sweep_locked(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Result<(Vec<AgentStatusRecord>, Vec<AgentId>), RegistryError> {
        let mut records = self.store.scan().await?;
        let mut demoted = Vec::new();
        for record in records.iter_mut() {
            if record.is_online() && record.is_stale(now, threshold) {
                record.status = AgentStatus::Offline;
                self.store.upsert(record.clone()).await?;

                info!(
                    agent_id = %record.agent_id,
                    last_heartbeat = %record.last_heartbeat,
                    "Agent went offline"
                );
                self.emit(RegistryEvent::WentOffline {
                    agent_id: record.agent_id.clone(),
                });
                demoted.push(record.agent_id.clone());
            }
        }
        Ok((records, demoted))
    }

    /// Every record regardless of status; no side effects
    pub async fn list_all(&self) -> Result<Vec<AgentStatusRecord>, RegistryError> {
        let mut records = self.store.scan().await?;
        records.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(records)
    }

    pub async fn get(&self, agent_id: &AgentId) -> Result<Option<AgentStatusRecord>, RegistryError> {
        Ok(self.store.get(agent_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn registry() -> (AgentRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let registry = AgentRegistry::new(Arc::new(InMemoryAgentStore::new()), clock.clone());
        (registry, clock)
    }

    fn identity(id: &str) -> AgentIdentity {
        AgentIdentity::new(AgentId::parse(id).unwrap(), format!("{id} name"), "research")
    }

    #[tokio::test]
    async fn test_repeated_registration_keeps_one_record() {
        let (registry, clock) = registry();
        let first = registry.register(identity("A1")).await.unwrap();

        for _ in 0..3 {
            clock.advance(Duration::seconds(20));
            let again = registry.register(identity("A1")).await.unwrap();
            assert_eq!(again.created_at, first.created_at);
            assert_eq!(again.last_heartbeat, clock.now());
        }

        assert_eq!(registry.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_for_unknown_agent_changes_nothing() {
        let (registry, _clock) = registry();
        registry.register(identity("A1")).await.unwrap();
        let before = registry.list_all().await.unwrap();

        let err = registry
            .heartbeat(&AgentId::parse("ghost").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(ref id) if id.as_str() == "ghost"));
        assert_eq!(registry.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_list_active_sweeps_stale_agents() {
        let (registry, clock) = registry();
        let threshold = Duration::minutes(5);
        registry.register(identity("A1")).await.unwrap();
        registry.register(identity("A2")).await.unwrap();

        clock.advance(Duration::minutes(4));
        registry.heartbeat(&AgentId::parse("A2").unwrap()).await.unwrap();
        clock.advance(Duration::minutes(2));

        let active = registry.list_active(threshold).await.unwrap();
        let ids: Vec<_> = active.iter().map(|r| r.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["A2"]);

        let a1 = registry
            .get(&AgentId::parse("A1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a1.status, AgentStatus::Offline);
    }

    #[tokio::test]
    async fn test_heartbeat_brings_agent_back_online() {
        let (registry, clock) = registry();
        let id = AgentId::parse("A1").unwrap();
        registry.register(identity("A1")).await.unwrap();

        clock.advance(Duration::minutes(10));
        assert_eq!(registry.sweep(Duration::minutes(5)).await.unwrap(), vec![id.clone()]);

        let record = registry.heartbeat(&id).await.unwrap();
        assert_eq!(record.status, AgentStatus::Online);
        assert_eq!(registry.list_active(Duration::minutes(5)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_reports_only_newly_offline() {
        let (registry, clock) = registry();
        registry.register(identity("A1")).await.unwrap();
        clock.advance(Duration::minutes(10));

        assert_eq!(registry.sweep(Duration::minutes(5)).await.unwrap().len(), 1);
        assert!(registry.sweep(Duration::minutes(5)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_has_no_side_effects() {
        let (registry, clock) = registry();
        registry.register(identity("A1")).await.unwrap();
        clock.advance(Duration::hours(1));

        let all = registry.list_all().await.unwrap();
        assert_eq!(all[0].status, AgentStatus::Online);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (registry, clock) = registry();
        let mut events = registry.subscribe();
        let id = AgentId::parse("A1").unwrap();

        registry.register(identity("A1")).await.unwrap();
        registry.heartbeat(&id).await.unwrap();
        clock.advance(Duration::minutes(6));
        registry.list_active(Duration::minutes(5)).await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), RegistryEvent::Registered { .. }));
        assert!(matches!(events.recv().await.unwrap(), RegistryEvent::Heartbeat { .. }));
        assert_eq!(
            events.recv().await.unwrap(),
            RegistryEvent::WentOffline { agent_id: id }
        );
    }
}
