// In-memory reference store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{StoreError, WorkflowStore};
use crate::workflows::types::{Workflow, WorkflowId};

#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn load(&self, id: &WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().await.get(id).cloned())
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Workflow>, StoreError> {
        Ok(self.workflows.read().await.values().cloned().collect())
    }
}
