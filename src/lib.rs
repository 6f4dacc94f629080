// Stagegate - multi-stage approval workflow engine
// This exposes the core components for embedding and integration tests

pub mod config;
pub mod observability;
pub mod store;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use self::config::{config, init_config, StagegateConfig};
pub use observability::{EngineMetrics, EngineStats, OperationTimer};
pub use store::{FileSystemWorkflowStore, InMemoryWorkflowStore, StoreError, WorkflowStore};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflows::{
    ApproverId, ErrorKind, EventSink, StageId, Workflow, WorkflowDefinition, WorkflowEngine,
    WorkflowError, WorkflowEvent, WorkflowId, WorkflowStatus,
};
