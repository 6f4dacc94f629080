// Atomic state transitions for approval workflows.
// Every precondition is checked before the first write, so a failed
// transition leaves the workflow exactly as it was.

use chrono::{DateTime, Utc};
use tracing::info;

use super::error::WorkflowError;
use super::events::WorkflowEvent;
use super::quorum::{check_eligibility, evaluate_stage, next_workflow_state};
use super::types::{ApproverId, StageId, StageStatus, Workflow, WorkflowStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateTransition {
    Activate,
    Approve {
        stage_id: StageId,
        approver_id: ApproverId,
    },
    Reject {
        stage_id: StageId,
        approver_id: ApproverId,
        reason: String,
    },
    Cancel {
        cancelled_by: String,
    },
}

impl StateTransition {
    pub fn operation(&self) -> &'static str {
        match self {
            StateTransition::Activate => "activate",
            StateTransition::Approve { .. } => "approve",
            StateTransition::Reject { .. } => "reject",
            StateTransition::Cancel { .. } => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub previous_status: WorkflowStatus,
    pub new_status: WorkflowStatus,
    /// In causal order: stage-level events precede workflow-level ones
    pub events: Vec<WorkflowEvent>,
}

/// Apply `transition` to `workflow` in place
pub fn apply_transition(
    workflow: &mut Workflow,
    transition: &StateTransition,
    now: DateTime<Utc>,
) -> Result<TransitionResult, WorkflowError> {
    let previous_status = workflow.status;

    let events = match transition {
        StateTransition::Activate => activate(workflow)?,
        StateTransition::Approve {
            stage_id,
            approver_id,
        } => approve(workflow, stage_id, approver_id, now)?,
        StateTransition::Reject {
            stage_id,
            approver_id,
            reason,
        } => reject(workflow, stage_id, approver_id, reason, now)?,
        StateTransition::Cancel { cancelled_by } => cancel(workflow, cancelled_by, now)?,
    };

    info!(
        workflow.id = %workflow.id,
        operation = transition.operation(),
        from_status = %previous_status,
        to_status = %workflow.status,
        current_stage_index = workflow.current_stage_index,
        "Workflow transition applied"
    );

    Ok(TransitionResult {
        previous_status,
        new_status: workflow.status,
        events,
    })
}

fn invalid_state(workflow: &Workflow, operation: &'static str) -> WorkflowError {
    WorkflowError::InvalidState {
        workflow_id: workflow.id.clone(),
        status: workflow.status,
        operation,
    }
}

fn activate(workflow: &mut Workflow) -> Result<Vec<WorkflowEvent>, WorkflowError> {
    if workflow.status != WorkflowStatus::Draft {
        return Err(invalid_state(workflow, "activate"));
    }

    workflow.status = WorkflowStatus::InProgress;
    workflow.current_stage_index = 0;

    Ok(vec![WorkflowEvent::WorkflowActivated {
        workflow_id: workflow.id.clone(),
    }])
}

/// Shared gate for approve and reject: returns the index of the targeted stage
fn decision_target(
    workflow: &Workflow,
    stage_id: &StageId,
    approver_id: &ApproverId,
    operation: &'static str,
) -> Result<usize, WorkflowError> {
    if workflow.status != WorkflowStatus::InProgress {
        return Err(invalid_state(workflow, operation));
    }

    let index = workflow
        .stage_index(stage_id)
        .ok_or_else(|| WorkflowError::StageNotFound {
            workflow_id: workflow.id.clone(),
            stage_id: stage_id.clone(),
        })?;

    let current = workflow
        .current_stage()
        .ok_or_else(|| invalid_state(workflow, operation))?;

    if index != workflow.current_stage_index {
        return Err(WorkflowError::WrongStage {
            requested: stage_id.clone(),
            current: current.id.clone(),
        });
    }

    if !current.status.is_pending() {
        return Err(invalid_state(workflow, operation));
    }

    check_eligibility(current, approver_id).map_err(|reason| WorkflowError::NotEligible {
        approver_id: approver_id.clone(),
        stage_id: stage_id.clone(),
        reason,
    })?;

    Ok(index)
}

fn approve(
    workflow: &mut Workflow,
    stage_id: &StageId,
    approver_id: &ApproverId,
    now: DateTime<Utc>,
) -> Result<Vec<WorkflowEvent>, WorkflowError> {
    let index = decision_target(workflow, stage_id, approver_id, "approve")?;
    let workflow_id = workflow.id.clone();

    let stage = &mut workflow.stages[index];
    stage.current_approvals.insert(approver_id.clone());

    let mut events = vec![WorkflowEvent::ApprovalRecorded {
        workflow_id: workflow_id.clone(),
        stage_id: stage_id.clone(),
        approver_id: approver_id.clone(),
    }];

    let decision = evaluate_stage(stage);
    if decision.status != StageStatus::Approved {
        return Ok(events);
    }

    stage.status = StageStatus::Approved;
    stage.completed_at = Some(now);
    events.push(WorkflowEvent::StageApproved {
        workflow_id: workflow_id.clone(),
        stage_id: stage_id.clone(),
    });

    let next = next_workflow_state(workflow, index);
    workflow.current_stage_index = next.current_stage_index;
    workflow.status = next.status;

    if next.status == WorkflowStatus::Approved {
        workflow.completed_at = Some(now);
        events.push(WorkflowEvent::WorkflowApproved { workflow_id });
    }

    Ok(events)
}

fn reject(
    workflow: &mut Workflow,
    stage_id: &StageId,
    approver_id: &ApproverId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Vec<WorkflowEvent>, WorkflowError> {
    let index = decision_target(workflow, stage_id, approver_id, "reject")?;

    let stage = &mut workflow.stages[index];
    stage.status = StageStatus::Rejected;
    stage.comments = Some(reason.to_string());
    stage.completed_at = Some(now);

    // Later stages stay pending and the index stays put
    workflow.status = WorkflowStatus::Rejected;
    workflow.completed_at = Some(now);
    workflow.final_decision = Some(reason.to_string());

    Ok(vec![
        WorkflowEvent::StageRejected {
            workflow_id: workflow.id.clone(),
            stage_id: stage_id.clone(),
            reason: reason.to_string(),
        },
        WorkflowEvent::WorkflowRejected {
            workflow_id: workflow.id.clone(),
            reason: reason.to_string(),
        },
    ])
}

fn cancel(
    workflow: &mut Workflow,
    cancelled_by: &str,
    now: DateTime<Utc>,
) -> Result<Vec<WorkflowEvent>, WorkflowError> {
    if !matches!(
        workflow.status,
        WorkflowStatus::Draft | WorkflowStatus::InProgress
    ) {
        return Err(invalid_state(workflow, "cancel"));
    }

    workflow.status = WorkflowStatus::Cancelled;
    workflow.completed_at = Some(now);
    workflow.cancelled_by = Some(cancelled_by.to_string());

    Ok(vec![WorkflowEvent::WorkflowCancelled {
        workflow_id: workflow.id.clone(),
        cancelled_by: cancelled_by.to_string(),
    }])
}
