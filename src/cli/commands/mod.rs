use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use stagegate::config::StagegateConfig;
use stagegate::store::FileSystemWorkflowStore;
use stagegate::workflows::{LoggingEventSink, WorkflowEngine};

pub mod config;
pub mod create;
pub mod decide;
pub mod inspect;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, engine: &WorkflowEngine) -> Result<()>;
}

/// Engine over the file store, with events written to the log
pub fn open_engine(config: &StagegateConfig, store_dir: Option<PathBuf>) -> WorkflowEngine {
    let directory = store_dir.unwrap_or_else(|| PathBuf::from(&config.store.directory));
    tracing::debug!(store = ?directory, "Opening workflow store");

    WorkflowEngine::new(Arc::new(FileSystemWorkflowStore::new(directory)))
        .with_event_sink(Arc::new(LoggingEventSink))
        .with_limits(config.engine.validation_limits())
}
