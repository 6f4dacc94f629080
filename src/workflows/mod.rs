// Multi-stage approval workflows: data model, rules and the engine that runs them

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod quorum;
pub mod report;
pub mod state_machine;
pub mod types;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::WorkflowEngine;
pub use error::{DefinitionIssue, ErrorKind, Ineligibility, WorkflowError};
pub use events::{
    BroadcastEventSink, CompositeEventSink, EventSink, LoggingEventSink, WorkflowEvent,
};
pub use quorum::{can_approve, eligible_approvers, evaluate_stage, next_workflow_state, progress};
pub use report::{overdue_stages, stage_standings, summarize, StageStanding, WorkflowSummary};
pub use state_machine::{apply_transition, StateTransition, TransitionResult};
pub use types::{
    ApproverId, Stage, StageDefinition, StageId, StageStatus, Workflow, WorkflowDefinition,
    WorkflowId, WorkflowSnapshot, WorkflowStatus,
};
pub use validation::{validate_definition, ValidationLimits};
