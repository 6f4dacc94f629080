use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::workflows::ValidationLimits;

/// Main configuration structure for Stagegate
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StagegateConfig {
    /// Workflow storage settings
    pub store: StoreConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Definition limits
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding one JSON record per workflow
    pub directory: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (overridden by RUST_LOG)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Maximum number of stages in one workflow
    pub max_stages: usize,
    /// Maximum length of any identifier in a definition
    pub max_identifier_length: usize,
}

impl EngineConfig {
    pub fn validation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_stages: self.max_stages,
            max_identifier_length: self.max_identifier_length,
        }
    }
}

impl Default for StagegateConfig {
    fn default() -> Self {
        let limits = ValidationLimits::default();
        Self {
            store: StoreConfig {
                directory: ".stagegate/workflows".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
            engine: EngineConfig {
                max_stages: limits.max_stages,
                max_identifier_length: limits.max_identifier_length,
            },
        }
    }
}

impl StagegateConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (stagegate.toml, .stagegate-rc)
    /// 3. Environment variables (STAGEGATE__SECTION__KEY)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`StagegateConfig::load`], looking for files under `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let toml_path = dir.join("stagegate.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path));
        }

        let rc_path = dir.join(".stagegate-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("STAGEGATE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<StagegateConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = StagegateConfig::load_env_file();
        StagegateConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static StagegateConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
