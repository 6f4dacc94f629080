// Read models for board and list views. Nothing here mutates a workflow.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use super::quorum::{eligible_approvers, progress};
use super::types::{ApproverId, StageId, StageStatus, Workflow, WorkflowId, WorkflowStatus};

/// Where a stage sits relative to the workflow's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStanding {
    Completed,
    Current,
    NotReached,
    Rejected,
    Skipped,
}

impl std::fmt::Display for StageStanding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StageStanding::Completed => "completed",
            StageStanding::Current => "current",
            StageStanding::NotReached => "not-reached",
            StageStanding::Rejected => "rejected",
            StageStanding::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// One standing per stage, in stage order.
/// Only an in-progress workflow has a `Current` stage.
pub fn stage_standings(workflow: &Workflow) -> Vec<(StageId, StageStanding)> {
    workflow
        .stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let standing = match stage.status {
                StageStatus::Approved => StageStanding::Completed,
                StageStatus::Rejected => StageStanding::Rejected,
                StageStatus::Skipped => StageStanding::Skipped,
                StageStatus::Pending
                    if workflow.status == WorkflowStatus::InProgress
                        && index == workflow.current_stage_index =>
                {
                    StageStanding::Current
                }
                StageStatus::Pending => StageStanding::NotReached,
            };
            (stage.id.clone(), standing)
        })
        .collect()
}

/// Pending stages of a live workflow whose due date is behind `now`
pub fn overdue_stages(workflow: &Workflow, now: DateTime<Utc>) -> Vec<StageId> {
    if workflow.status.is_terminal() {
        return Vec::new();
    }
    workflow
        .stages
        .iter()
        .filter(|stage| stage.status.is_pending())
        .filter(|stage| stage.due_date.is_some_and(|due| due < now))
        .map(|stage| stage.id.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
    pub subject_id: String,
    pub status: WorkflowStatus,
    pub progress: f64,
    /// Name of the stage awaiting decisions, if any
    pub current_stage: Option<String>,
    pub pending_approvers: BTreeSet<ApproverId>,
    pub overdue: bool,
}

pub fn summarize(workflow: &Workflow, now: DateTime<Utc>) -> WorkflowSummary {
    let current_stage = match workflow.status {
        WorkflowStatus::InProgress => workflow.current_stage().map(|stage| stage.name.clone()),
        _ => None,
    };

    WorkflowSummary {
        id: workflow.id.clone(),
        name: workflow.name.clone(),
        subject_id: workflow.subject_id.clone(),
        status: workflow.status,
        progress: progress(workflow),
        current_stage,
        pending_approvers: eligible_approvers(workflow),
        overdue: !overdue_stages(workflow, now).is_empty(),
    }
}
