//! Persistence behind the agent registry
//!
//! The registry only needs keyed get/upsert and a full scan, so any
//! key-value engine can sit behind [`AgentStore`].

use async_trait::async_trait;
use nexus_mesh::AgentId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::record::AgentStatusRecord;

#[derive(Debug, thiserror::Error)]
#[error("Agent store error: {0}")]
pub struct StoreError(pub String);

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<AgentStatusRecord>, StoreError>;

    /// Insert or replace the record keyed by its `agent_id`
    async fn upsert(&self, record: AgentStatusRecord) -> Result<(), StoreError>;

    /// Every record, in no particular order
    async fn scan(&self) -> Result<Vec<AgentStatusRecord>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryAgentStore {
    records: RwLock<HashMap<AgentId, AgentStatusRecord>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<AgentStatusRecord>, StoreError> {
        Ok(self.records.read().await.get(agent_id).cloned())
    }

    async fn upsert(&self, record: AgentStatusRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.agent_id.clone(), record);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<AgentStatusRecord>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
