// File system store: one JSON document per workflow

use async_trait::async_trait;
use fd_lock::RwLock;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tokio::fs;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{RecordLock, StoreError, WorkflowStore};
use crate::workflows::types::{Workflow, WorkflowId};

const RECORD_SUFFIX: &str = ".workflow.json";
const LOCK_SUFFIX: &str = ".workflow.lock";

#[derive(Debug, Clone)]
pub struct FileSystemWorkflowStore {
    directory: PathBuf,
}

impl FileSystemWorkflowStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Ids become file names, so only a conservative character set is allowed
    fn usable_key(id: &WorkflowId) -> bool {
        let key = id.as_str();
        !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    fn record_path(&self, id: &WorkflowId) -> Result<PathBuf, StoreError> {
        if !Self::usable_key(id) {
            return Err(StoreError::InvalidKey(id.clone()));
        }
        Ok(self.directory.join(format!("{id}{RECORD_SUFFIX}")))
    }

    async fn read_record(&self, path: &Path) -> Result<Workflow, StoreError> {
        let contents = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[async_trait]
impl WorkflowStore for FileSystemWorkflowStore {
    /// Exclusive `fd-lock` on `<id>.workflow.lock`, shared by every process using the directory.
    /// The OS lock is taken and held on a blocking thread until the returned guard is dropped.
    async fn lock(&self, id: &WorkflowId) -> Result<RecordLock, StoreError> {
        if !Self::usable_key(id) {
            // Nothing can be stored under this id
            return Ok(RecordLock::unlocked());
        }
        fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(format!("{id}{LOCK_SUFFIX}"));

        let (acquired_tx, acquired_rx) = oneshot::channel::<std::io::Result<()>>();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        tokio::task::spawn_blocking(move || {
            let file = match std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) => {
                    let _ = acquired_tx.send(Err(e));
                    return;
                }
            };

            let mut lock = RwLock::new(file);
            match lock.write() {
                Ok(_guard) => {
                    if acquired_tx.send(Ok(())).is_ok() {
                        // Returns once the RecordLock is dropped
                        let _ = release_rx.recv();
                    }
                }
                Err(e) => {
                    let _ = acquired_tx.send(Err(e));
                }
            };
        });

        acquired_rx
            .await
            .map_err(|_| StoreError::Unavailable(format!("lock for {id} was abandoned")))??;
        debug!(workflow.id = %id, "Workflow record locked");
        Ok(RecordLock::held(release_tx))
    }

    async fn load(&self, id: &WorkflowId) -> Result<Option<Workflow>, StoreError> {
        if !Self::usable_key(id) {
            debug!(workflow.id = %id, "Id cannot name a stored workflow");
            return Ok(None);
        }
        let path = self.record_path(id)?;
        if !fs::try_exists(&path).await? {
            debug!(workflow.id = %id, file = ?path, "No stored workflow found");
            return Ok(None);
        }

        let workflow = self.read_record(&path).await?;
        if &workflow.id != id {
            return Err(StoreError::Corrupted {
                reason: format!("{} holds workflow '{}'", path.display(), workflow.id),
            });
        }

        debug!(workflow.id = %id, status = %workflow.status, "Workflow loaded");
        Ok(Some(workflow))
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let path = self.record_path(&workflow.id)?;
        fs::create_dir_all(&self.directory).await?;

        let serialized = serde_json::to_string_pretty(workflow)?;

        // Write to a uniquely named temporary file first, then rename (atomic operation)
        let temp_path = path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        fs::write(&temp_path, serialized).await?;
        fs::rename(&temp_path, &path).await?;

        debug!(workflow.id = %workflow.id, file = ?path, "Workflow saved");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Workflow>, StoreError> {
        if !fs::try_exists(&self.directory).await? {
            return Ok(Vec::new());
        }

        let mut workflows = Vec::new();
        let mut entries = fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_record = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.ends_with(RECORD_SUFFIX))
                .unwrap_or(false);
            if !is_record {
                continue;
            }

            match self.read_record(&path).await {
                Ok(workflow) => workflows.push(workflow),
                Err(e) => {
                    warn!(file = ?path, error = %e, "Skipping unreadable workflow record");
                }
            }
        }

        Ok(workflows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::types::{StageDefinition, WorkflowDefinition};
    use chrono::Utc;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("stagegate-store-{}", uuid::Uuid::new_v4()))
    }

    fn workflow(id: &str) -> Workflow {
        let definition = WorkflowDefinition {
            subject_id: "P005".to_string(),
            name: "IT Ticket Routing Approval".to_string(),
            description: String::new(),
            initiated_by: "Lisa".to_string(),
            stages: vec![StageDefinition {
                id: "architecture".into(),
                name: "Architecture Review".to_string(),
                description: String::new(),
                approvers: vec!["Emma".into()],
                required_approvals: 1,
                due_date: None,
            }],
        };
        Workflow::from_definition(WorkflowId::from(id), definition, Utc::now())
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = scratch_dir();
        let store = FileSystemWorkflowStore::new(&dir);
        let wf = workflow("wf-1");

        assert!(store.load(&wf.id).await.unwrap().is_none());
        store.save(&wf).await.unwrap();
        assert_eq!(store.load(&wf.id).await.unwrap(), Some(wf));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_list_skips_foreign_files() {
        let dir = scratch_dir();
        let store = FileSystemWorkflowStore::new(&dir);
        store.save(&workflow("wf-1")).await.unwrap();
        store.save(&workflow("wf-2")).await.unwrap();
        std::fs::write(dir.join("notes.txt"), "not a workflow").unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_list_of_missing_directory_is_empty() {
        let store = FileSystemWorkflowStore::new(scratch_dir());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsafe_ids_load_as_missing_but_never_save() {
        let store = FileSystemWorkflowStore::new(scratch_dir());
        for id in ["../escape", "", ".hidden", "a/b"] {
            let id = WorkflowId::from(id);
            assert!(store.load(&id).await.unwrap().is_none());
            assert!(!store.lock(&id).await.unwrap().is_held());

            let err = store.save(&workflow(id.as_str())).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_record_lock_excludes_other_store_handles() {
        let dir = scratch_dir();
        let first = FileSystemWorkflowStore::new(&dir);
        let second = FileSystemWorkflowStore::new(&dir);
        let id = WorkflowId::from("wf-1");

        let held = first.lock(&id).await.unwrap();
        assert!(held.is_held());

        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            second.lock(&id),
        )
        .await;
        assert!(waiting.is_err(), "second handle must wait while the lock is held");

        drop(held);
        let reacquired = tokio::time::timeout(std::time::Duration::from_secs(5), second.lock(&id))
            .await
            .expect("lock is released on drop")
            .unwrap();
        assert!(reacquired.is_held());

        // Other ids are unaffected
        let other = first.lock(&WorkflowId::from("wf-2")).await.unwrap();
        assert!(other.is_held());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temporary_files() {
        let dir = scratch_dir();
        let store = FileSystemWorkflowStore::new(&dir);
        store.save(&workflow("wf-1")).await.unwrap();
        store.save(&workflow("wf-1")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["wf-1.workflow.json".to_string()]);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_mismatched_record_is_corrupted() {
        let dir = scratch_dir();
        let store = FileSystemWorkflowStore::new(&dir);
        store.save(&workflow("wf-1")).await.unwrap();
        std::fs::rename(
            dir.join("wf-1.workflow.json"),
            dir.join("wf-2.workflow.json"),
        )
        .unwrap();

        let err = store.load(&WorkflowId::from("wf-2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));

        let _ = std::fs::remove_dir_all(dir);
    }
}
