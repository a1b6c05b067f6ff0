//! Integration tests for the build pipeline
//!
//! Uses an in-process compiler that writes library files where cargo would,
//! so the whole pipeline runs without a real toolchain.

use kiln_build::{
    BuildResult, CacheState, CacheToggle, CompileInvocation, CompileStatus, CompileTarget,
    Compiler, FailurePolicy, Orchestrator, PipelineLayout, PipelineState, PolicySection,
    StageDirectory, StageStatus,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Stands in for cargo: records calls and writes plugin libraries into target/release
#[derive(Default)]
struct FakeCargo {
    plugin_outputs: Vec<&'static str>,
    failing: Vec<CompileTarget>,
    calls: Vec<CompileTarget>,
    cache_during_plugin_build: Vec<CacheState>,
}

impl FakeCargo {
    fn producing(outputs: &[&'static str]) -> Self {
        Self {
            plugin_outputs: outputs.to_vec(),
            ..Self::default()
        }
    }

    fn failing(mut self, target: CompileTarget) -> Self {
        self.failing.push(target);
        self
    }
}

impl Compiler for FakeCargo {
    fn compile(&mut self, invocation: &CompileInvocation) -> BuildResult<CompileStatus> {
        self.calls.push(invocation.target);

        if invocation.target == CompileTarget::PluginLibraries {
            let workspace = &invocation.working_dir;
            let cache = CacheToggle::new(workspace.join("target"), workspace.join(".target"));
            self.cache_during_plugin_build.push(cache.state()?);

            // Failing builds may still leave some artifacts behind
            let release = workspace.join("target/release");
            fs::create_dir_all(release.join("deps")).unwrap();
            for name in &self.plugin_outputs {
                fs::write(release.join(name), *name).unwrap();
            }
        }

        if self.failing.contains(&invocation.target) {
            Ok(CompileStatus::failed(101))
        } else {
            Ok(CompileStatus::success())
        }
    }
}

/// Create a repository root with an empty plugin workspace
fn create_repo() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    fs::create_dir(temp.path().join("builtin_libraries")).unwrap();
    temp
}

fn orchestrator_for(root: &Path, compiler: FakeCargo) -> Orchestrator<FakeCargo> {
    Orchestrator::with_compiler(PipelineLayout::new(root), compiler)
}

fn cache_state(root: &Path) -> CacheState {
    PipelineLayout::new(root).cache().state().unwrap()
}

fn staged_files(root: &Path) -> Vec<String> {
    StageDirectory::new(root.join("builtin_libraries/libraries"))
        .staged_files()
        .unwrap()
}

#[test]
fn test_full_pipeline_stages_plugins() {
    let repo = create_repo();
    let compiler =
        FakeCargo::producing(&["libcore.so", "core.dll", "notes.txt", "libextra.dylib"]);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    let report = orchestrator.run();

    assert!(report.is_success(), "{:?}", report);
    assert_eq!(orchestrator.state(), PipelineState::Done);
    assert_eq!(orchestrator.compiler().calls, CompileTarget::all().to_vec());
    assert_eq!(
        staged_files(repo.path()),
        vec!["core.dll", "core.so", "extra.dylib"]
    );
    assert_eq!(report.staged().count(), 3);
}

#[test]
fn test_hidden_cache_restored_after_plugin_stage() {
    let repo = create_repo();
    fs::create_dir_all(repo.path().join("builtin_libraries/.target/release")).unwrap();
    let compiler = FakeCargo::producing(&["libcore.so"]);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    let outcome = orchestrator.run_stage(CompileTarget::PluginLibraries);

    assert!(outcome.status.is_success());
    assert_eq!(cache_state(repo.path()), CacheState::Hidden);
    assert_eq!(staged_files(repo.path()), vec!["core.so"]);
    assert_eq!(
        orchestrator.compiler().cache_during_plugin_build,
        vec![CacheState::Visible]
    );
}

#[test]
fn test_first_build_creates_hidden_cache() {
    let repo = create_repo();
    let compiler = FakeCargo::producing(&["libcore.so"]);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    orchestrator.run();

    assert_eq!(
        orchestrator.compiler().cache_during_plugin_build,
        vec![CacheState::Absent]
    );
    assert_eq!(cache_state(repo.path()), CacheState::Hidden);
}

#[test]
fn test_rerun_produces_same_staging_set() {
    let repo = create_repo();
    let layout = PipelineLayout::new(repo.path());

    let compiler = FakeCargo::producing(&["libcore.so", "core.dll", "libextra.dylib"]);
    Orchestrator::with_compiler(layout.clone(), compiler).run();
    let first = staged_files(repo.path());

    let compiler = FakeCargo::producing(&["libcore.so", "core.dll", "libextra.dylib"]);
    Orchestrator::with_compiler(layout, compiler).run();
    let second = staged_files(repo.path());

    assert_eq!(first, second);
    assert_eq!(cache_state(repo.path()), CacheState::Hidden);
}

#[test]
fn test_plugin_compile_failure_still_stages_and_hides() {
    let repo = create_repo();
    let compiler =
        FakeCargo::producing(&["libpartial.so"]).failing(CompileTarget::PluginLibraries);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    let report = orchestrator.run();

    let plugins = report.outcome(CompileTarget::PluginLibraries).unwrap();
    assert!(matches!(
        plugins.status,
        StageStatus::CompileFailed {
            exit_code: Some(101)
        }
    ));
    assert_eq!(staged_files(repo.path()), vec!["partial.so"]);
    assert_eq!(cache_state(repo.path()), CacheState::Hidden);
    // The installer still ran
    assert_eq!(report.stages.len(), 3);
}

#[test]
fn test_unlaunchable_compiler_leaves_cache_hidden() {
    let repo = create_repo();
    let mut layout = PipelineLayout::new(repo.path());
    layout.cargo = "kiln-no-such-cargo".to_string();
    fs::create_dir(repo.path().join("builtin_libraries/.target")).unwrap();
    let mut orchestrator = Orchestrator::new(layout);

    let report = orchestrator.run();

    assert_eq!(report.stages.len(), 3);
    assert!(report
        .stages
        .iter()
        .all(|s| matches!(s.status, StageStatus::Failed(ref e) if e.is_spawn_failure())));
    assert!(staged_files(repo.path()).is_empty());
    assert_eq!(cache_state(repo.path()), CacheState::Hidden);
}

#[test]
fn test_staging_failure_still_hides_cache() {
    let repo = create_repo();
    fs::create_dir(repo.path().join("builtin_libraries/.target")).unwrap();
    fs::write(repo.path().join("builtin_libraries/libraries"), "in the way").unwrap();
    let compiler = FakeCargo::producing(&["libcore.so"]);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    let report = orchestrator.run();

    let plugins = report.outcome(CompileTarget::PluginLibraries).unwrap();
    assert!(matches!(plugins.status, StageStatus::Failed(_)));
    assert_eq!(cache_state(repo.path()), CacheState::Hidden);
    assert!(report.outcome(CompileTarget::Installer).is_some());
}

#[test]
fn test_staging_failure_keeps_compile_status() {
    let repo = create_repo();
    fs::write(repo.path().join("builtin_libraries/libraries"), "in the way").unwrap();
    let compiler =
        FakeCargo::producing(&["libcore.so"]).failing(CompileTarget::PluginLibraries);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    let report = orchestrator.run();

    let plugins = report.outcome(CompileTarget::PluginLibraries).unwrap();
    assert!(matches!(
        plugins.status,
        StageStatus::Failed(kiln_build::BuildError::IoError { .. })
    ));
    assert_eq!(plugins.compile_status, Some(CompileStatus::failed(101)));
    assert_eq!(cache_state(repo.path()), CacheState::Hidden);
}

#[test]
fn test_cache_conflict_fails_plugin_stage_without_compiling() {
    let repo = create_repo();
    fs::create_dir(repo.path().join("builtin_libraries/target")).unwrap();
    fs::create_dir(repo.path().join("builtin_libraries/.target")).unwrap();
    let compiler = FakeCargo::producing(&["libcore.so"]);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    let report = orchestrator.run();

    assert!(matches!(
        report.outcome(CompileTarget::PluginLibraries).unwrap().status,
        StageStatus::Failed(kiln_build::BuildError::CacheConflict { .. })
    ));
    assert_eq!(
        report.outcome(CompileTarget::PluginLibraries).unwrap().compile_status,
        None
    );
    assert_eq!(
        orchestrator.compiler().calls,
        vec![CompileTarget::Cli, CompileTarget::Installer]
    );
}

#[test]
fn test_fail_fast_stops_pipeline() {
    let repo = create_repo();
    let layout = PipelineLayout::new(repo.path())
        .with_policies(PolicySection::uniform(FailurePolicy::FailFast));
    let compiler = FakeCargo::producing(&["libcore.so"]).failing(CompileTarget::Cli);
    let mut orchestrator = Orchestrator::with_compiler(layout, compiler);

    let report = orchestrator.run();

    assert!(report.aborted);
    assert_eq!(report.stages.len(), 1);
    assert_eq!(orchestrator.compiler().calls, vec![CompileTarget::Cli]);
    assert!(!repo.path().join("builtin_libraries/libraries").exists());
}

#[test]
fn test_continue_on_error_reaches_done() {
    let repo = create_repo();
    let compiler = FakeCargo::producing(&[])
        .failing(CompileTarget::Cli)
        .failing(CompileTarget::Installer);
    let mut orchestrator = orchestrator_for(repo.path(), compiler);

    let report = orchestrator.run();

    assert!(!report.aborted);
    assert_eq!(orchestrator.state(), PipelineState::Done);
    let failed: Vec<_> = report.failures().map(|s| s.target).collect();
    assert_eq!(failed, vec![CompileTarget::Cli, CompileTarget::Installer]);
}
