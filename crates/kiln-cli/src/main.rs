use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod commands;
mod logging;

/// Build the CLI tool, the builtin plugin libraries and the installer.
///
/// Runs the three builds in order. After the plugin libraries are compiled,
/// their shared-library files are renamed to a platform-neutral form and
/// staged for the CLI tool to load at runtime. The plugin workspace's build
/// cache is kept hidden between runs.
///
/// Run without arguments from the repository root to build everything.
///
/// ENVIRONMENT VARIABLES:
///     KILN_PROFILE      Build profile (dev or release)
///     KILN_CARGO        Cargo executable to invoke
///     KILN_FAIL_FAST    Set to '1' to stop at the first failed stage
///     KILN_JSON         Set to '1' for a JSON report
///     RUST_LOG          Log filter (overrides --verbose/--quiet)
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version)]
struct Cli {
    /// Repository root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Build profile (dev or release)
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Stop the pipeline at the first failed stage
    #[arg(long)]
    fail_fast: bool,

    /// Verbose output
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet output (warnings and errors only)
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Print the build report as JSON
    #[arg(long, env = "KILN_JSON")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(logging::Verbosity::from_flags(cli.verbose, cli.quiet));

    commands::build::run(commands::build::BuildArgs {
        project_dir: cli.project_dir,
        profile: cli.profile,
        fail_fast: cli.fail_fast,
        quiet: cli.quiet,
        json: cli.json,
    })
}
