use anyhow::{Context, Result};
use std::path::PathBuf;

use super::Command;
use stagegate::workflows::{WorkflowDefinition, WorkflowEngine};

pub struct CreateCommand {
    pub file: PathBuf,
}

impl CreateCommand {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }

    fn read_definition(&self) -> Result<WorkflowDefinition> {
        let contents = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a valid workflow definition", self.file.display()))
    }
}

impl Command for CreateCommand {
    async fn execute(&self, engine: &WorkflowEngine) -> Result<()> {
        let definition = self.read_definition()?;
        let stages = definition.stages.len();
        let id = engine.create_workflow(definition).await?;

        println!("📝 Created workflow {id} ({stages} stages, draft)");
        println!("💡 Run 'stagegate activate {id}' to open the first stage");
        Ok(())
    }
}
