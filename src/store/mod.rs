//! Workflow persistence boundary
//!
//! The engine treats storage as a key-value map from workflow id to the whole
//! workflow record. The engine serializes read-modify-write cycles within one
//! process; stores shared between processes also hand out a [`RecordLock`]
//! that the engine holds from load until save.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::workflows::types::{Workflow, WorkflowId};

pub mod file;
pub mod memory;

pub use file::FileSystemWorkflowStore;
pub use memory::InMemoryWorkflowStore;

/// Errors that can occur while loading or saving workflows
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Stored record is corrupted: {reason}")]
    Corrupted { reason: String },

    #[error("Workflow id '{0}' cannot be used as a storage key")]
    InvalidKey(WorkflowId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Exclusive claim on one workflow record. Dropping it releases the record.
#[derive(Debug, Default)]
pub struct RecordLock {
    release: Option<std::sync::mpsc::Sender<()>>,
}

impl RecordLock {
    /// For stores that are never shared outside the engine's process
    pub fn unlocked() -> Self {
        Self::default()
    }

    /// Held until `release` is dropped; the holder waits on the other end
    pub fn held(release: std::sync::mpsc::Sender<()>) -> Self {
        Self {
            release: Some(release),
        }
    }

    pub fn is_held(&self) -> bool {
        self.release.is_some()
    }
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Wait for exclusive use of the record for `id` across every holder of the store
    async fn lock(&self, _id: &WorkflowId) -> Result<RecordLock, StoreError> {
        Ok(RecordLock::unlocked())
    }

    /// `Ok(None)` when no workflow has this id
    async fn load(&self, id: &WorkflowId) -> Result<Option<Workflow>, StoreError>;

    /// Insert or replace the record for `workflow.id`
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Every stored workflow, in no particular order
    async fn list(&self) -> Result<Vec<Workflow>, StoreError>;
}
