use anyhow::Result;

use super::Command;
use stagegate::workflows::{
    ApproverId, StageId, StateTransition, WorkflowEngine, WorkflowId, WorkflowSnapshot,
    WorkflowStatus,
};

/// Any command that moves a workflow through its lifecycle
pub struct DecisionCommand {
    pub workflow_id: WorkflowId,
    pub transition: StateTransition,
}

impl DecisionCommand {
    pub fn activate(workflow_id: &str) -> Self {
        Self::new(workflow_id, StateTransition::Activate)
    }

    pub fn approve(workflow_id: &str, stage: &str, approver: &str) -> Self {
        Self::new(
            workflow_id,
            StateTransition::Approve {
                stage_id: StageId::from(stage),
                approver_id: ApproverId::from(approver),
            },
        )
    }

    pub fn reject(workflow_id: &str, stage: &str, approver: &str, reason: &str) -> Self {
        Self::new(
            workflow_id,
            StateTransition::Reject {
                stage_id: StageId::from(stage),
                approver_id: ApproverId::from(approver),
                reason: reason.to_string(),
            },
        )
    }

    pub fn cancel(workflow_id: &str, cancelled_by: &str) -> Self {
        Self::new(
            workflow_id,
            StateTransition::Cancel {
                cancelled_by: cancelled_by.to_string(),
            },
        )
    }

    fn new(workflow_id: &str, transition: StateTransition) -> Self {
        Self {
            workflow_id: WorkflowId::from(workflow_id),
            transition,
        }
    }
}

impl Command for DecisionCommand {
    async fn execute(&self, engine: &WorkflowEngine) -> Result<()> {
        let workflow = engine
            .execute_atomic_transition(&self.workflow_id, self.transition.clone())
            .await?;
        print_outcome(&workflow);
        Ok(())
    }
}

fn print_outcome(workflow: &WorkflowSnapshot) {
    match workflow.status {
        WorkflowStatus::InProgress => {
            if let Some(stage) = workflow.current_stage() {
                println!(
                    "✅ {}: stage '{}' has {}/{} approvals",
                    workflow.id,
                    stage.name,
                    stage.current_approvals.len(),
                    stage.required_approvals
                );
            }
        }
        WorkflowStatus::Approved => println!("🎉 {}: approved", workflow.id),
        WorkflowStatus::Rejected => println!(
            "⛔ {}: rejected ({})",
            workflow.id,
            workflow.final_decision.as_deref().unwrap_or("")
        ),
        WorkflowStatus::Cancelled => println!(
            "🚫 {}: cancelled by {}",
            workflow.id,
            workflow.cancelled_by.as_deref().unwrap_or("unknown")
        ),
        WorkflowStatus::Draft => println!("📝 {}: draft", workflow.id),
    }
}
