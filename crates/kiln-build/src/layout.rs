//! Resolved filesystem layout and compiler settings for one pipeline run
//!
//! Every path is derived from an explicit repository root; nothing here reads
//! or changes the process working directory.

use crate::cache::CacheToggle;
use crate::error::{BuildError, BuildResult};
use crate::profile::Profile;
use crate::stage::StageDirectory;
use crate::targets::{CompileInvocation, CompileTarget};
use kiln_config::{Config, ConfigError, PipelineConfig, PolicySection};
use std::path::{Path, PathBuf};

/// Paths and settings the orchestrator works with
#[derive(Debug, Clone)]
pub struct PipelineLayout {
    /// Repository root (cli and installer are built here)
    pub root: PathBuf,
    /// Plugin-library workspace
    pub workspace: PathBuf,
    /// Staging directory for normalized libraries
    pub staging: PathBuf,
    /// Cache directory name while compiling
    pub cache_visible: String,
    /// Cache directory name between runs
    pub cache_hidden: String,
    /// Cargo executable
    pub cargo: String,
    /// Binary name of the command-line front-end
    pub cli_bin: String,
    /// Binary name of the installer
    pub installer_bin: String,
    /// Build profile
    pub profile: Profile,
    /// Per-stage failure policies
    pub policies: PolicySection,
}

impl PipelineLayout {
    /// Default layout for the repository at `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::from_pipeline(root.as_ref(), &PipelineConfig::default(), Profile::default())
    }

    /// Build the layout from loaded configuration
    pub fn from_config(config: &Config) -> BuildResult<Self> {
        let profile = Profile::from_str(&config.pipeline.build.profile).ok_or_else(|| {
            BuildError::Config(ConfigError::invalid_value(
                "build.profile",
                format!("unknown profile '{}'", config.pipeline.build.profile),
            ))
        })?;

        Ok(Self::from_pipeline(&config.root, &config.pipeline, profile))
    }

    fn from_pipeline(root: &Path, pipeline: &PipelineConfig, profile: Profile) -> Self {
        let workspace = root.join(&pipeline.workspace.dir);
        Self {
            root: root.to_path_buf(),
            staging: workspace.join(&pipeline.workspace.staging),
            workspace,
            cache_visible: pipeline.cache.visible.clone(),
            cache_hidden: pipeline.cache.hidden.clone(),
            cargo: pipeline.build.cargo.clone(),
            cli_bin: pipeline.build.cli_bin.clone(),
            installer_bin: pipeline.build.installer_bin.clone(),
            profile,
            policies: pipeline.policy,
        }
    }

    /// Set the build profile
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the failure policies
    pub fn with_policies(mut self, policies: PolicySection) -> Self {
        self.policies = policies;
        self
    }

    /// Cache toggle for the plugin workspace
    pub fn cache(&self) -> CacheToggle {
        CacheToggle::new(
            self.workspace.join(&self.cache_visible),
            self.workspace.join(&self.cache_hidden),
        )
    }

    /// Staging directory handle
    pub fn stage(&self) -> StageDirectory {
        StageDirectory::new(&self.staging)
    }

    /// Where cargo writes the plugin libraries for the current profile
    pub fn plugin_output_dir(&self) -> PathBuf {
        self.workspace
            .join(&self.cache_visible)
            .join(self.profile.output_dir_name())
    }

    /// Compiler command for a target
    pub fn invocation(&self, target: CompileTarget) -> CompileInvocation {
        let mut args = vec!["build".to_string()];
        args.extend(self.profile.cargo_args().iter().map(|a| a.to_string()));

        let working_dir = match target {
            CompileTarget::Cli => {
                args.push(format!("--bin={}", self.cli_bin));
                self.root.clone()
            }
            CompileTarget::PluginLibraries => self.workspace.clone(),
            CompileTarget::Installer => {
                args.push(format!("--bin={}", self.installer_bin));
                self.root.clone()
            }
        };

        CompileInvocation {
            target,
            program: self.cargo.clone(),
            args,
            working_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::FailurePolicy;

    #[test]
    fn test_default_paths() {
        let layout = PipelineLayout::new("/repo");
        assert_eq!(layout.workspace, PathBuf::from("/repo/builtin_libraries"));
        assert_eq!(
            layout.staging,
            PathBuf::from("/repo/builtin_libraries/libraries")
        );
        assert_eq!(
            layout.plugin_output_dir(),
            PathBuf::from("/repo/builtin_libraries/target/release")
        );
        assert_eq!(
            layout.cache().hidden_path(),
            Path::new("/repo/builtin_libraries/.target")
        );
    }

    #[test]
    fn test_cli_invocation() {
        let inv = PipelineLayout::new("/repo").invocation(CompileTarget::Cli);
        assert_eq!(inv.program, "cargo");
        assert_eq!(inv.args, vec!["build", "--release", "--bin=cli"]);
        assert_eq!(inv.working_dir, PathBuf::from("/repo"));
    }

    #[test]
    fn test_plugin_invocation_builds_whole_workspace() {
        let inv = PipelineLayout::new("/repo").invocation(CompileTarget::PluginLibraries);
        assert_eq!(inv.args, vec!["build", "--release"]);
        assert_eq!(inv.working_dir, PathBuf::from("/repo/builtin_libraries"));
    }

    #[test]
    fn test_dev_profile_invocation() {
        let layout = PipelineLayout::new("/repo").with_profile(Profile::Dev);
        let inv = layout.invocation(CompileTarget::Installer);
        assert_eq!(inv.args, vec!["build", "--bin=installer"]);
        assert_eq!(
            layout.plugin_output_dir(),
            PathBuf::from("/repo/builtin_libraries/target/debug")
        );
    }

    #[test]
    fn test_with_policies() {
        let layout = PipelineLayout::new("/repo")
            .with_policies(PolicySection::uniform(FailurePolicy::FailFast));
        assert_eq!(layout.policies.plugins, FailurePolicy::FailFast);
    }
}
