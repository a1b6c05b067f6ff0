//! Build command - run the full pipeline and report per-stage results

use anyhow::{Context, Result};
use kiln_build::{
    BuildReport, FailurePolicy, Orchestrator, PipelineLayout, PolicySection, Profile,
};
use kiln_config::ConfigLoader;
use std::path::PathBuf;

/// Build command arguments
#[derive(Debug, Default)]
pub struct BuildArgs {
    /// Repository root (defaults to current directory)
    pub project_dir: Option<PathBuf>,
    /// Build profile override
    pub profile: Option<String>,
    /// Abort on the first failed stage
    pub fail_fast: bool,
    /// Quiet output (errors only)
    pub quiet: bool,
    /// JSON output
    pub json: bool,
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let project_dir = args
        .project_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let config = ConfigLoader::new()
        .load_from_directory(&project_dir)
        .with_context(|| format!("Failed to load configuration from {}", project_dir.display()))?;

    let layout = configure_layout(PipelineLayout::from_config(&config)?, &args)?;
    let profile = layout.profile;

    let mut orchestrator = Orchestrator::new(layout);
    let report = orchestrator.run();

    if args.json {
        println!("{}", report_json(&report, profile));
    } else if !args.quiet {
        print_summary(&report, profile);
    }

    if report.aborted {
        let failed = report
            .failures()
            .last()
            .map(|s| s.target.to_string())
            .unwrap_or_default();
        anyhow::bail!("Build aborted after the {} stage failed", failed);
    }

    Ok(())
}

/// Apply command-line overrides on top of the configured layout
fn configure_layout(mut layout: PipelineLayout, args: &BuildArgs) -> Result<PipelineLayout> {
    if let Some(ref name) = args.profile {
        let profile = Profile::from_str(name)
            .ok_or_else(|| anyhow::anyhow!("Invalid profile: {} (expected dev or release)", name))?;
        layout = layout.with_profile(profile);
    }

    if args.fail_fast {
        layout = layout.with_policies(PolicySection::uniform(FailurePolicy::FailFast));
    }

    Ok(layout)
}

fn report_json(report: &BuildReport, profile: Profile) -> serde_json::Value {
    let stages: Vec<_> = report
        .stages
        .iter()
        .map(|stage| {
            serde_json::json!({
                "target": stage.target,
                "success": stage.status.is_success(),
                "status": stage.status.to_string(),
                "exit_code": stage.compile_status.and_then(|s| s.exit_code),
                "elapsed": stage.elapsed.as_secs_f64(),
                "staged": stage
                    .staged
                    .iter()
                    .map(|a| a.staged_name.as_str())
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({
        "success": report.is_success(),
        "aborted": report.aborted,
        "profile": profile.name(),
        "total_time": report.total_time.as_secs_f64(),
        "stages": stages,
    })
}

fn print_summary(report: &BuildReport, profile: Profile) {
    println!("\n{}", "=".repeat(60));
    if report.is_success() {
        println!("Build succeeded in {:.2}s", report.total_time.as_secs_f64());
    } else {
        println!(
            "Build finished with failures in {:.2}s",
            report.total_time.as_secs_f64()
        );
    }
    println!("{}", "=".repeat(60));
    println!("  Profile: {}", profile);
    for stage in &report.stages {
        println!("  {:<17} {}", format!("{}:", stage.target), stage.status);
    }
    let staged: Vec<_> = report.staged().map(|a| a.staged_name.as_str()).collect();
    if !staged.is_empty() {
        println!("  Staged: {}", staged.join(", "));
    }
    println!("{}", "=".repeat(60));
}
