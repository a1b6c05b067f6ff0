//! Configuration Loader
//!
//! Handles loading the pipeline configuration and applying overrides with proper precedence.

use crate::pipeline::{FailurePolicy, PipelineConfig, PolicySection};
use crate::{ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Loads configuration with the following precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Pipeline config (./kiln.toml) - overrides defaults
/// 3. Environment variables (KILN_*) - overrides the file
/// 4. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip KILN_* environment overrides
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Effective pipeline configuration
    pub pipeline: PipelineConfig,

    /// Repository root every relative path is resolved against
    pub root: PathBuf,

    /// The kiln.toml that was read, if any
    pub source: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Do not consult KILN_* environment variables
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration for the repository rooted at `root`
    ///
    /// The root is not searched upwards: the pipeline always runs against the
    /// directory it was pointed at. A missing kiln.toml means defaults.
    pub fn load_from_directory(&self, root: &Path) -> ConfigResult<Config> {
        let config_path = root.join(CONFIG_FILE_NAME);

        let (pipeline, source) = if config_path.is_file() {
            (PipelineConfig::load_from_file(&config_path)?, Some(config_path))
        } else {
            (PipelineConfig::default(), None)
        };

        let pipeline = if self.ignore_env {
            pipeline
        } else {
            self.apply_env_overrides(pipeline)?
        };

        Ok(Config {
            pipeline,
            root: root.to_path_buf(),
            source,
        })
    }

    /// Apply environment variable overrides to the pipeline config
    ///
    /// Recognized variables: KILN_PROFILE, KILN_CARGO, KILN_FAIL_FAST
    fn apply_env_overrides(&self, mut config: PipelineConfig) -> ConfigResult<PipelineConfig> {
        if let Ok(profile) = env::var("KILN_PROFILE") {
            config.build.profile = profile.to_lowercase();
        }

        if let Ok(cargo) = env::var("KILN_CARGO") {
            config.build.cargo = cargo;
        }

        if let Ok(fail_fast) = env::var("KILN_FAIL_FAST") {
            if matches!(fail_fast.to_lowercase().as_str(), "true" | "1" | "yes") {
                config.policy = PolicySection::uniform(FailurePolicy::FailFast);
            }
        }

        // Overrides go through the same checks as the file
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Plugin-library workspace directory
    pub fn workspace_dir(&self) -> PathBuf {
        self.root.join(&self.pipeline.workspace.dir)
    }

    /// Staging directory
    pub fn staging_dir(&self) -> PathBuf {
        self.workspace_dir().join(&self.pipeline.workspace.staging)
    }

    /// Whether a kiln.toml was found
    pub fn has_config_file(&self) -> bool {
        self.source.is_some()
    }
}
