use anyhow::Result;
use clap::Parser;

mod cli;

use cli::commands::config::ConfigCommand;
use cli::commands::create::CreateCommand;
use cli::commands::decide::DecisionCommand;
use cli::commands::inspect::InspectCommand;
use cli::commands::{open_engine, Command};
use cli::{Cli, Commands};
use stagegate::config::StagegateConfig;
use stagegate::telemetry::init_telemetry;
use stagegate::workflows::{ApproverId, WorkflowId};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config: StagegateConfig = stagegate::config()?.clone();
    if cli.json_logs {
        config.observability.json_logs = true;
    }
    init_telemetry(&config.observability)?;

    if let Commands::Config { write } = &cli.command {
        return ConfigCommand {
            write: write.clone(),
        }
        .execute(&config);
    }

    let engine = open_engine(&config, cli.store_dir.clone());
    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(async {
        match cli.command {
            Commands::Create { file } => CreateCommand::new(file).execute(&engine).await,
            Commands::Activate { workflow_id } => {
                DecisionCommand::activate(&workflow_id).execute(&engine).await
            }
            Commands::Approve {
                workflow_id,
                stage,
                approver,
            } => {
                DecisionCommand::approve(&workflow_id, &stage, &approver)
                    .execute(&engine)
                    .await
            }
            Commands::Reject {
                workflow_id,
                stage,
                approver,
                reason,
            } => {
                DecisionCommand::reject(&workflow_id, &stage, &approver, &reason)
                    .execute(&engine)
                    .await
            }
            Commands::Cancel {
                workflow_id,
                cancelled_by,
            } => {
                DecisionCommand::cancel(&workflow_id, &cancelled_by)
                    .execute(&engine)
                    .await
            }
            Commands::Show { workflow_id, json } => {
                InspectCommand::Show {
                    workflow_id: WorkflowId::from(workflow_id),
                    json,
                }
                .execute(&engine)
                .await
            }
            Commands::List { subject } => InspectCommand::List { subject }.execute(&engine).await,
            Commands::Progress { workflow_id } => {
                InspectCommand::Progress {
                    workflow_id: WorkflowId::from(workflow_id),
                }
                .execute(&engine)
                .await
            }
            Commands::Eligible { workflow_id } => {
                InspectCommand::Eligible {
                    workflow_id: WorkflowId::from(workflow_id),
                }
                .execute(&engine)
                .await
            }
            Commands::CanApprove {
                workflow_id,
                approver,
            } => {
                InspectCommand::CanApprove {
                    workflow_id: WorkflowId::from(workflow_id),
                    approver: ApproverId::from(approver),
                }
                .execute(&engine)
                .await
            }
            Commands::Config { .. } => Ok(()),
        }
    });

    engine.metrics().log_stats();
    outcome
}
