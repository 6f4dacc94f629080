// Core types for the approval workflow engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

string_id!(
    /// Globally unique workflow identifier
    WorkflowId
);
string_id!(
    /// Stage identifier, unique within its workflow
    StageId
);
string_id!(
    /// Opaque approver identity supplied by the caller's identity layer
    ApproverId
);

impl WorkflowId {
    /// Mint a fresh identifier for a newly created workflow
    pub fn generate() -> Self {
        Self(format!("wf-{}", uuid::Uuid::new_v4()))
    }
}

/// Status of a single approval gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    Pending,
    Approved,
    Rejected,
    /// Counted as complete for progress; nothing in the engine produces it yet
    Skipped,
}

impl StageStatus {
    pub fn is_pending(self) -> bool {
        self == StageStatus::Pending
    }

    /// Approved or skipped stages count towards progress
    pub fn is_complete(self) -> bool {
        matches!(self, StageStatus::Approved | StageStatus::Skipped)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageStatus::Pending => "pending",
            StageStatus::Approved => "approved",
            StageStatus::Rejected => "rejected",
            StageStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Workflow-level lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    Draft,
    InProgress,
    Approved,
    Rejected,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal workflows accept queries only
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Approved | WorkflowStatus::Rejected | WorkflowStatus::Cancelled
        )
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::InProgress => "in-progress",
            WorkflowStatus::Approved => "approved",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// One gate in a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub description: String,
    pub approvers: BTreeSet<ApproverId>,
    pub required_approvals: usize,
    pub current_approvals: BTreeSet<ApproverId>,
    pub status: StageStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// Set exactly once, when the stage leaves `pending`
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

impl Stage {
    pub fn is_approver(&self, approver: &ApproverId) -> bool {
        self.approvers.contains(approver)
    }

    pub fn has_approved(&self, approver: &ApproverId) -> bool {
        self.current_approvals.contains(approver)
    }

    /// Approvals still missing before quorum is reached
    pub fn approvals_outstanding(&self) -> usize {
        self.required_approvals
            .saturating_sub(self.current_approvals.len())
    }
}

/// An ordered sequence of stages plus workflow-level status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    /// External object under review (a process, ticket, ...)
    pub subject_id: String,
    pub name: String,
    pub description: String,
    pub stages: Vec<Stage>,
    pub current_stage_index: usize,
    pub status: WorkflowStatus,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_decision: Option<String>,
    pub cancelled_by: Option<String>,
}

/// Owned copy of a workflow as it stood when a command completed
pub type WorkflowSnapshot = Workflow;

impl Workflow {
    /// Build a draft workflow from a definition that already passed validation
    pub fn from_definition(
        id: WorkflowId,
        definition: WorkflowDefinition,
        initiated_at: DateTime<Utc>,
    ) -> Self {
        let stages = definition
            .stages
            .into_iter()
            .map(|stage| Stage {
                id: stage.id,
                name: stage.name,
                description: stage.description,
                approvers: stage.approvers.into_iter().collect(),
                required_approvals: stage.required_approvals,
                current_approvals: BTreeSet::new(),
                status: StageStatus::Pending,
                due_date: stage.due_date,
                completed_at: None,
                comments: None,
            })
            .collect();

        Self {
            id,
            subject_id: definition.subject_id,
            name: definition.name,
            description: definition.description,
            stages,
            current_stage_index: 0,
            status: WorkflowStatus::Draft,
            initiated_by: definition.initiated_by,
            initiated_at,
            completed_at: None,
            final_decision: None,
            cancelled_by: None,
        }
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.get(self.current_stage_index)
    }

    pub fn stage_index(&self, stage_id: &StageId) -> Option<usize> {
        self.stages.iter().position(|stage| &stage.id == stage_id)
    }

    pub fn is_last_stage(&self, index: usize) -> bool {
        index + 1 == self.stages.len()
    }
}

/// Creation input for a single stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StageDefinition {
    pub id: StageId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Listed in display order; duplicates are rejected at validation
    pub approvers: Vec<ApproverId>,
    pub required_approvals: usize,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Creation input for `create_workflow`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowDefinition {
    pub subject_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub initiated_by: String,
    pub stages: Vec<StageDefinition>,
}
