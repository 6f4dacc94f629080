use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "stagegate")]
#[command(about = "Multi-stage approval workflows with per-stage quorum")]
#[command(long_about = "Stagegate moves a subject through an ordered sequence of approval stages. \
                       Each stage names its approvers and how many of them must sign off before \
                       the next stage opens. Any rejection ends the workflow.")]
pub struct Cli {
    /// Directory holding workflow records (overrides configuration)
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Emit JSON log lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a draft workflow from a JSON definition
    Create {
        /// Path to the workflow definition
        #[arg(long, short = 'f', value_name = "FILE")]
        file: PathBuf,
    },
    /// Open the first stage of a draft workflow
    Activate {
        workflow_id: String,
    },
    /// Record an approval on the current stage
    Approve {
        workflow_id: String,
        #[arg(long)]
        stage: String,
        #[arg(long)]
        approver: String,
    },
    /// Reject the current stage, ending the workflow
    Reject {
        workflow_id: String,
        #[arg(long)]
        stage: String,
        #[arg(long)]
        approver: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Withdraw a draft or in-progress workflow
    Cancel {
        workflow_id: String,
        #[arg(long = "by", value_name = "NAME")]
        cancelled_by: String,
    },
    /// Show one workflow with its stage standings
    Show {
        workflow_id: String,
        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// List workflows, oldest first
    List {
        /// Only workflows reviewing this subject
        #[arg(long)]
        subject: Option<String>,
    },
    /// Percentage of stages completed
    Progress {
        workflow_id: String,
    },
    /// Approvers who may still act on the current stage
    Eligible {
        workflow_id: String,
    },
    /// Whether an approver may act on the current stage right now
    CanApprove {
        workflow_id: String,
        #[arg(long)]
        approver: String,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to this TOML file
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },
}
