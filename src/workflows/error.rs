// Typed errors returned by every engine command and query

use thiserror::Error;

use super::types::{ApproverId, StageId, WorkflowId, WorkflowStatus};
use crate::store::StoreError;

/// A single problem found while validating a workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionIssue {
    #[error("workflow has a blank name")]
    BlankWorkflowName,
    #[error("workflow has no stages")]
    NoStages,
    #[error("workflow has {count} stages, at most {max} allowed")]
    TooManyStages { count: usize, max: usize },
    #[error("stage id '{stage_id}' is used more than once")]
    DuplicateStageId { stage_id: StageId },
    #[error("stage '{stage_id}' has a blank name")]
    BlankStageName { stage_id: StageId },
    #[error("stage '{stage_id}' lists no approvers")]
    NoApprovers { stage_id: StageId },
    #[error("stage '{stage_id}' lists approver '{approver_id}' more than once")]
    DuplicateApprover {
        stage_id: StageId,
        approver_id: ApproverId,
    },
    #[error("stage '{stage_id}' requires {required} approvals but must require between 1 and {approvers}")]
    QuorumOutOfBounds {
        stage_id: StageId,
        required: usize,
        approvers: usize,
    },
    #[error("{field} '{value}' is not a well-formed identifier")]
    MalformedIdentifier { field: &'static str, value: String },
}

/// Why an approver may not act on the current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    NotAnApprover,
    AlreadyApproved,
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ineligibility::NotAnApprover => f.write_str("not an approver for this stage"),
            Ineligibility::AlreadyApproved => f.write_str("approval already recorded"),
        }
    }
}

/// Caller-facing error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidDefinition,
    InvalidState,
    WrongStage,
    NotEligible,
    Store,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow '{workflow_id}' not found")]
    NotFound { workflow_id: WorkflowId },

    #[error("stage '{stage_id}' not found in workflow '{workflow_id}'")]
    StageNotFound {
        workflow_id: WorkflowId,
        stage_id: StageId,
    },

    #[error("invalid workflow definition: {}", format_issues(.issues))]
    InvalidDefinition { issues: Vec<DefinitionIssue> },

    #[error("cannot {operation} workflow '{workflow_id}' while it is {status}")]
    InvalidState {
        workflow_id: WorkflowId,
        status: WorkflowStatus,
        operation: &'static str,
    },

    #[error("stage '{requested}' is not the current stage '{current}'")]
    WrongStage {
        requested: StageId,
        current: StageId,
    },

    #[error("'{approver_id}' cannot act on stage '{stage_id}': {reason}")]
    NotEligible {
        approver_id: ApproverId,
        stage_id: StageId,
        reason: Ineligibility,
    },

    #[error("workflow store error: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::NotFound { .. } | WorkflowError::StageNotFound { .. } => {
                ErrorKind::NotFound
            }
            WorkflowError::InvalidDefinition { .. } => ErrorKind::InvalidDefinition,
            WorkflowError::InvalidState { .. } => ErrorKind::InvalidState,
            WorkflowError::WrongStage { .. } => ErrorKind::WrongStage,
            WorkflowError::NotEligible { .. } => ErrorKind::NotEligible,
            WorkflowError::Store(_) => ErrorKind::Store,
        }
    }
}

fn format_issues(issues: &[DefinitionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
