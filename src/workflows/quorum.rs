//! Quorum evaluation
//!
//! Pure functions over a stage or workflow snapshot. Nothing here mutates
//! state; the state machine applies whatever these functions decide.

use std::collections::BTreeSet;

use super::error::Ineligibility;
use super::types::{ApproverId, Stage, StageStatus, Workflow, WorkflowStatus};

/// Outcome of evaluating a stage's approvals against its quorum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDecision {
    pub status: StageStatus,
    pub reached_quorum: bool,
}

/// Workflow position after a stage has been approved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextWorkflowState {
    pub status: WorkflowStatus,
    pub current_stage_index: usize,
}

/// Approved once quorum is met, otherwise the status is left as it was.
/// Rejection is an explicit command and never comes out of this function.
pub fn evaluate_stage(stage: &Stage) -> StageDecision {
    let reached_quorum = stage.current_approvals.len() >= stage.required_approvals;
    let status = if reached_quorum && stage.status.is_pending() {
        StageStatus::Approved
    } else {
        stage.status
    };

    StageDecision {
        status,
        reached_quorum,
    }
}

/// Where the workflow goes once the stage at `evaluated_stage_index` is approved.
/// Approving the last stage completes the workflow and leaves the index on it.
pub fn next_workflow_state(workflow: &Workflow, evaluated_stage_index: usize) -> NextWorkflowState {
    if workflow.is_last_stage(evaluated_stage_index) {
        NextWorkflowState {
            status: WorkflowStatus::Approved,
            current_stage_index: evaluated_stage_index,
        }
    } else {
        NextWorkflowState {
            status: WorkflowStatus::InProgress,
            current_stage_index: evaluated_stage_index + 1,
        }
    }
}

/// Percentage of stages that are approved or skipped, in `[0, 100]`
pub fn progress(workflow: &Workflow) -> f64 {
    if workflow.stages.is_empty() {
        return 0.0;
    }

    let completed = workflow
        .stages
        .iter()
        .filter(|stage| stage.status.is_complete())
        .count();

    100.0 * completed as f64 / workflow.stages.len() as f64
}

/// The current stage, but only while the workflow can still accept decisions on it
fn actionable_stage(workflow: &Workflow) -> Option<&Stage> {
    if workflow.status != WorkflowStatus::InProgress {
        return None;
    }
    workflow
        .current_stage()
        .filter(|stage| stage.status.is_pending())
}

/// Approvers of the current stage who have not yet approved it
pub fn eligible_approvers(workflow: &Workflow) -> BTreeSet<ApproverId> {
    match actionable_stage(workflow) {
        Some(stage) => stage
            .approvers
            .difference(&stage.current_approvals)
            .cloned()
            .collect(),
        None => BTreeSet::new(),
    }
}

/// Explains why `approver` may not act on the current stage.
/// Callers check workflow status and stage position first.
pub fn check_eligibility(stage: &Stage, approver: &ApproverId) -> Result<(), Ineligibility> {
    if !stage.is_approver(approver) {
        return Err(Ineligibility::NotAnApprover);
    }
    if stage.has_approved(approver) {
        return Err(Ineligibility::AlreadyApproved);
    }
    Ok(())
}

pub fn can_approve(workflow: &Workflow, approver: &ApproverId) -> bool {
    actionable_stage(workflow)
        .map(|stage| check_eligibility(stage, approver).is_ok())
        .unwrap_or(false)
}
