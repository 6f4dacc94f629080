use anyhow::Result;

use super::Command;
use stagegate::workflows::{stage_standings, summarize, ApproverId, WorkflowEngine, WorkflowId};

pub enum InspectCommand {
    Show { workflow_id: WorkflowId, json: bool },
    List { subject: Option<String> },
    Progress { workflow_id: WorkflowId },
    Eligible { workflow_id: WorkflowId },
    CanApprove { workflow_id: WorkflowId, approver: ApproverId },
}

impl Command for InspectCommand {
    async fn execute(&self, engine: &WorkflowEngine) -> Result<()> {
        match self {
            InspectCommand::Show { workflow_id, json } => show(engine, workflow_id, *json).await,
            InspectCommand::List { subject } => list(engine, subject.as_deref()).await,
            InspectCommand::Progress { workflow_id } => {
                println!("{:.1}", engine.progress(workflow_id).await?);
                Ok(())
            }
            InspectCommand::Eligible { workflow_id } => {
                for approver in engine.eligible_approvers(workflow_id).await? {
                    println!("{approver}");
                }
                Ok(())
            }
            InspectCommand::CanApprove {
                workflow_id,
                approver,
            } => {
                println!("{}", engine.can_approve(workflow_id, approver).await?);
                Ok(())
            }
        }
    }
}

async fn show(engine: &WorkflowEngine, workflow_id: &WorkflowId, json: bool) -> Result<()> {
    let workflow = engine.get_workflow(workflow_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&workflow)?);
        return Ok(());
    }

    let summary = engine.summarize(workflow_id).await?;
    println!("📋 {} ({})", workflow.name, workflow.id);
    println!("   Subject: {}", workflow.subject_id);
    println!("   Status: {}  Progress: {:.0}%", workflow.status, summary.progress);
    if summary.overdue {
        println!("   ⏰ A pending stage is past its due date");
    }
    for (stage, (_, standing)) in workflow.stages.iter().zip(stage_standings(&workflow)) {
        println!(
            "   [{standing}] {} ({}/{} of {})",
            stage.name,
            stage.current_approvals.len(),
            stage.required_approvals,
            stage.approvers.len()
        );
    }
    if let Some(reason) = &workflow.final_decision {
        println!("   Decision: {reason}");
    }
    Ok(())
}

async fn list(engine: &WorkflowEngine, subject: Option<&str>) -> Result<()> {
    let workflows = engine.list_workflows(subject).await?;
    if workflows.is_empty() {
        println!("📋 No workflows found");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for workflow in workflows {
        let summary = summarize(&workflow, now);
        println!(
            "{}  {:<12} {:>5.1}%  {}  {}",
            summary.id,
            summary.status.to_string(),
            summary.progress,
            summary.subject_id,
            summary.current_stage.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
