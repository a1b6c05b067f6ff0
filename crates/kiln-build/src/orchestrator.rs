//! Build orchestration and pipeline management
//!
//! Runs the three compile targets in a fixed order. The plugin-library stage is
//! bracketed by the cache guard and followed by artifact staging:
//!
//! ```text
//! Idle -> BuildingCli -> BuildingPlugins -> BuildingInstaller -> Done
//!                         |
//!                         +- reveal cache
//!                         +- cargo build (whole workspace)
//!                         +- stage libraries from target/<profile>
//!                         +- hide cache (always)
//! ```
//!
//! What happens after a failed stage is decided by that stage's
//! [`FailurePolicy`]. Under the default `ContinueOnError` every stage runs and
//! the pipeline always reaches `Done`.

use crate::artifact::StagedArtifact;
use crate::error::{BuildError, BuildResult};
use crate::layout::PipelineLayout;
use crate::targets::{CargoCompiler, CompileStatus, CompileTarget, Compiler};
use kiln_config::FailurePolicy;
use std::time::{Duration, Instant};

/// Where the pipeline currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    BuildingCli,
    BuildingPlugins,
    BuildingInstaller,
    Done,
}

impl PipelineState {
    /// State in which `target` is being built
    pub fn building(target: CompileTarget) -> Self {
        match target {
            CompileTarget::Cli => Self::BuildingCli,
            CompileTarget::PluginLibraries => Self::BuildingPlugins,
            CompileTarget::Installer => Self::BuildingInstaller,
        }
    }
}

/// Result of a single stage
#[derive(Debug)]
pub enum StageStatus {
    /// Compiler succeeded and every post-build step completed
    Succeeded,
    /// Compiler ran and exited unsuccessfully
    CompileFailed { exit_code: Option<i32> },
    /// The stage could not complete (compiler not launched, rename or copy failed)
    Failed(BuildError),
}

impl StageStatus {
    /// Check if the stage succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "ok"),
            Self::CompileFailed {
                exit_code: Some(code),
            } => write!(f, "compile failed (exit code {})", code),
            Self::CompileFailed { exit_code: None } => write!(f, "compile failed (killed)"),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Outcome of one stage of the pipeline
#[derive(Debug)]
pub struct StageOutcome {
    /// Stage target
    pub target: CompileTarget,
    /// How it ended
    pub status: StageStatus,
    /// Exit status of the compiler, if it ran
    pub compile_status: Option<CompileStatus>,
    /// Libraries staged (plugin stage only)
    pub staged: Vec<StagedArtifact>,
    /// Wall-clock time spent in the stage
    pub elapsed: Duration,
}

/// Everything a pipeline run did
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Outcomes of the stages that ran, in order
    pub stages: Vec<StageOutcome>,
    /// Whether a fail-fast stage stopped the run early
    pub aborted: bool,
    /// Total build time
    pub total_time: Duration,
}

impl BuildReport {
    /// All stages ran and succeeded
    pub fn is_success(&self) -> bool {
        !self.aborted
            && self.stages.len() == CompileTarget::all().len()
            && self.stages.iter().all(|s| s.status.is_success())
    }

    /// Stages that did not succeed
    pub fn failures(&self) -> impl Iterator<Item = &StageOutcome> {
        self.stages.iter().filter(|s| !s.status.is_success())
    }

    /// Outcome for a target, if its stage ran
    pub fn outcome(&self, target: CompileTarget) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.target == target)
    }

    /// Libraries staged during the run
    pub fn staged(&self) -> impl Iterator<Item = &StagedArtifact> {
        self.stages.iter().flat_map(|s| s.staged.iter())
    }
}

/// Sequences the compile targets of a toolchain
pub struct Orchestrator<C = CargoCompiler> {
    layout: PipelineLayout,
    compiler: C,
    state: PipelineState,
}

impl Orchestrator<CargoCompiler> {
    /// Create an orchestrator that compiles with cargo
    pub fn new(layout: PipelineLayout) -> Self {
        Self::with_compiler(layout, CargoCompiler::new())
    }
}

impl<C: Compiler> Orchestrator<C> {
    /// Create an orchestrator with a custom compiler
    pub fn with_compiler(layout: PipelineLayout, compiler: C) -> Self {
        Self {
            layout,
            compiler,
            state: PipelineState::Idle,
        }
    }

    /// Layout this orchestrator builds
    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }

    /// Current pipeline state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The compiler in use
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Failure policy of a stage
    pub fn policy(&self, target: CompileTarget) -> FailurePolicy {
        let policies = &self.layout.policies;
        match target {
            CompileTarget::Cli => policies.cli,
            CompileTarget::PluginLibraries => policies.plugins,
            CompileTarget::Installer => policies.installer,
        }
    }

    /// Run every stage in order
    pub fn run(&mut self) -> BuildReport {
        let build_start = Instant::now();
        let mut report = BuildReport::default();

        for target in CompileTarget::all() {
            let outcome = self.run_stage(target);
            let failed = !outcome.status.is_success();
            report.stages.push(outcome);

            if failed && self.policy(target).aborts() {
                tracing::error!("{} stage is fail-fast; stopping the pipeline", target);
                report.aborted = true;
                break;
            }
        }

        self.state = PipelineState::Done;
        report.total_time = build_start.elapsed();
        report
    }

    /// Run a single stage
    pub fn run_stage(&mut self, target: CompileTarget) -> StageOutcome {
        self.state = PipelineState::building(target);
        tracing::info!("Compiling {}", target.description());

        let stage_start = Instant::now();
        let (status, compile_status, staged) = match target {
            CompileTarget::PluginLibraries => self.build_plugins(),
            CompileTarget::Cli | CompileTarget::Installer => {
                let (status, compile_status) = self.compile(target);
                (status, compile_status, Vec::new())
            }
        };
        let elapsed = stage_start.elapsed();

        match &status {
            StageStatus::Succeeded => tracing::info!(
                "Compiled {} in {:.2}s",
                target.description(),
                elapsed.as_secs_f64()
            ),
            failure => tracing::error!("{} stage: {}", target, failure),
        }

        StageOutcome {
            target,
            status,
            compile_status,
            staged,
            elapsed,
        }
    }

    fn compile(&mut self, target: CompileTarget) -> (StageStatus, Option<CompileStatus>) {
        let invocation = self.layout.invocation(target);

        match self.compiler.compile(&invocation) {
            Ok(status) if status.succeeded() => (StageStatus::Succeeded, Some(status)),
            Ok(status) => (
                StageStatus::CompileFailed {
                    exit_code: status.exit_code,
                },
                Some(status),
            ),
            Err(e) => (StageStatus::Failed(e), None),
        }
    }

    /// Reveal cache, compile, stage, hide cache. Staging and hiding run even
    /// when the compile fails.
    ///
    /// When a later step fails the stage reports that failure; the compiler's
    /// own exit status is still returned and logged.
    fn build_plugins(&mut self) -> (StageStatus, Option<CompileStatus>, Vec<StagedArtifact>) {
        let cache = self.layout.cache();
        let guard = match cache.acquire() {
            Ok(guard) => guard,
            Err(e) => return (StageStatus::Failed(e), None, Vec::new()),
        };

        let (compiled, compile_status) = self.compile(CompileTarget::PluginLibraries);
        let staged = self.stage_plugins();
        let released = guard.release();
        let compile_failure = match &compiled {
            StageStatus::CompileFailed { .. } => Some(compiled.to_string()),
            _ => None,
        };

        let (status, staged) = match (staged, released) {
            (Err(e), released) => {
                if let Err(hide_error) = released {
                    tracing::error!("{}", hide_error);
                }
                (StageStatus::Failed(e), Vec::new())
            }
            (Ok(staged), Err(e)) => (StageStatus::Failed(e), staged),
            (Ok(staged), Ok(())) => (compiled, staged),
        };

        if let StageStatus::Failed(_) = status {
            if let Some(compiled) = compile_failure {
                tracing::error!("{} stage: {}", CompileTarget::PluginLibraries, compiled);
            }
        }

        (status, compile_status, staged)
    }

    fn stage_plugins(&self) -> BuildResult<Vec<StagedArtifact>> {
        let stage = self.layout.stage();
        let output_dir = self.layout.plugin_output_dir();

        if !output_dir.is_dir() {
            tracing::warn!(
                "no plugin output at {}; nothing to stage",
                output_dir.display()
            );
            stage.ensure()?;
            return Ok(Vec::new());
        }

        let staged = stage.stage_from(&output_dir)?;
        tracing::info!(
            "Staged {} libraries into {}",
            staged.len(),
            stage.path().display()
        );
        Ok(staged)
    }
}
