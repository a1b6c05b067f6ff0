//! Pipeline Configuration (kiln.toml)
//!
//! Handles the pipeline configuration stored in `kiln.toml` at the repository root.
//! Every section is optional; missing keys fall back to the conventional layout.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Pipeline configuration from kiln.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Plugin-library workspace layout
    pub workspace: WorkspaceSection,

    /// Build-cache directory names
    pub cache: CacheSection,

    /// Compiler invocation settings
    pub build: BuildSection,

    /// Per-stage failure policies
    pub policy: PolicySection,
}

/// Plugin-library workspace layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceSection {
    /// Workspace directory, relative to the repository root
    pub dir: PathBuf,

    /// Staging directory, relative to the workspace
    pub staging: PathBuf,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("builtin_libraries"),
            staging: PathBuf::from("libraries"),
        }
    }
}

/// Names under which the workspace build cache lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    /// Name used while compiling
    pub visible: String,

    /// Name used between runs
    pub hidden: String,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            visible: "target".to_string(),
            hidden: ".target".to_string(),
        }
    }
}

/// Compiler invocation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct BuildSection {
    /// Cargo executable
    pub cargo: String,

    /// Build profile (dev or release)
    pub profile: String,

    /// Binary name of the command-line front-end
    pub cli_bin: String,

    /// Binary name of the installer
    pub installer_bin: String,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            cargo: "cargo".to_string(),
            profile: "release".to_string(),
            cli_bin: "cli".to_string(),
            installer_bin: "installer".to_string(),
        }
    }
}

/// What the pipeline does after a stage fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure and run the next stage
    #[default]
    ContinueOnError,
    /// Stop the pipeline after this stage
    FailFast,
}

impl FailurePolicy {
    /// Get policy name
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContinueOnError => "continue-on-error",
            Self::FailFast => "fail-fast",
        }
    }

    /// Whether a failure under this policy stops the pipeline
    pub fn aborts(&self) -> bool {
        matches!(self, Self::FailFast)
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-stage failure policies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySection {
    pub cli: FailurePolicy,
    pub plugins: FailurePolicy,
    pub installer: FailurePolicy,
}

impl PolicySection {
    /// Same policy for every stage
    pub fn uniform(policy: FailurePolicy) -> Self {
        Self {
            cli: policy,
            plugins: policy,
            installer: policy,
        }
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> ConfigResult<()> {
        validate_relative("workspace.dir", &self.workspace.dir)?;
        validate_relative("workspace.staging", &self.workspace.staging)?;

        validate_dir_name("cache.visible", &self.cache.visible)?;
        validate_dir_name("cache.hidden", &self.cache.hidden)?;
        if self.cache.visible == self.cache.hidden {
            return Err(ConfigError::invalid_value(
                "cache.hidden",
                "must differ from cache.visible",
            ));
        }

        for (field, value) in [
            ("build.cargo", &self.build.cargo),
            ("build.cli-bin", &self.build.cli_bin),
            ("build.installer-bin", &self.build.installer_bin),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid_value(field, "cannot be empty"));
            }
        }

        if !matches!(self.build.profile.as_str(), "dev" | "release") {
            return Err(ConfigError::invalid_value(
                "build.profile",
                format!("unknown profile '{}' (expected dev or release)", self.build.profile),
            ));
        }

        Ok(())
    }
}

/// Workspace paths are resolved against the repository root, so they must stay relative
fn validate_relative(field: &str, path: &Path) -> ConfigResult<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if path.as_os_str().is_empty() || escapes {
        return Err(ConfigError::InvalidPath {
            field: field.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Cache names are renamed in place, so they must be a single path component
fn validate_dir_name(field: &str, name: &str) -> ConfigResult<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !single {
        return Err(ConfigError::invalid_value(
            field,
            format!("'{}' is not a plain directory name", name),
        ));
    }
    Ok(())
}
