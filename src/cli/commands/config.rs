use anyhow::Result;
use std::path::PathBuf;

use stagegate::config::StagegateConfig;

pub struct ConfigCommand {
    pub write: Option<PathBuf>,
}

impl ConfigCommand {
    /// Runs without an engine, so it sits outside the `Command` trait
    pub fn execute(&self, config: &StagegateConfig) -> Result<()> {
        print!("{}", toml::to_string_pretty(config)?);
        if let Some(path) = &self.write {
            config.save_to_file(path)?;
            println!("💾 Wrote {}", path.display());
        }
        Ok(())
    }
}
