/// Compile targets and the external compiler they are handed to
use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;

/// One of the three independently compiled parts of the toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileTarget {
    /// Command-line front-end
    Cli,
    /// Workspace of dynamically loaded plugin libraries
    PluginLibraries,
    /// Standalone installer
    Installer,
}

impl CompileTarget {
    /// All targets in build order
    pub fn all() -> [CompileTarget; 3] {
        [Self::Cli, Self::PluginLibraries, Self::Installer]
    }

    /// Human-readable description used in progress output
    pub fn description(&self) -> &'static str {
        match self {
            Self::Cli => "CLI tool",
            Self::PluginLibraries => "builtin libraries",
            Self::Installer => "installer",
        }
    }
}

impl std::fmt::Display for CompileTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::PluginLibraries => write!(f, "plugin-libraries"),
            Self::Installer => write!(f, "installer"),
        }
    }
}

/// A fully resolved compiler command for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInvocation {
    /// Target being compiled
    pub target: CompileTarget,
    /// Executable to run
    pub program: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Directory the command runs in
    pub working_dir: PathBuf,
}

impl CompileInvocation {
    /// Render as a shell-like command line for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit status of a compiler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileStatus {
    /// Process exit code; `None` when terminated by a signal
    pub exit_code: Option<i32>,
}

impl CompileStatus {
    /// Successful exit
    pub fn success() -> Self {
        Self { exit_code: Some(0) }
    }

    /// Exit with the given code
    pub fn failed(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
        }
    }

    /// Check if the compiler succeeded
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs an external compile step to completion
pub trait Compiler {
    /// Run the invocation, blocking until it exits.
    ///
    /// A non-zero exit is reported through [`CompileStatus`]; `Err` is reserved
    /// for failing to run the compiler at all.
    fn compile(&mut self, invocation: &CompileInvocation) -> BuildResult<CompileStatus>;
}

/// Runs cargo as a child process with inherited stdio
#[derive(Debug, Default, Clone)]
pub struct CargoCompiler;

impl CargoCompiler {
    /// Create a new cargo compiler
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for CargoCompiler {
    fn compile(&mut self, invocation: &CompileInvocation) -> BuildResult<CompileStatus> {
        tracing::debug!(
            "running `{}` in {}",
            invocation.command_line(),
            invocation.working_dir.display()
        );

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .status()
            .map_err(|e| BuildError::Spawn {
                target: invocation.target,
                error: e,
            })?;

        Ok(CompileStatus {
            exit_code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> CompileInvocation {
        CompileInvocation {
            target: CompileTarget::Cli,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: std::env::temp_dir(),
        }
    }

    #[test]
    fn test_build_order() {
        assert_eq!(
            CompileTarget::all(),
            [
                CompileTarget::Cli,
                CompileTarget::PluginLibraries,
                CompileTarget::Installer
            ]
        );
    }

    #[test]
    fn test_target_display() {
        assert_eq!(CompileTarget::Cli.to_string(), "cli");
        assert_eq!(CompileTarget::PluginLibraries.to_string(), "plugin-libraries");
        assert_eq!(CompileTarget::Installer.to_string(), "installer");
    }

    #[test]
    fn test_command_line() {
        let inv = invocation("cargo", &["build", "--release", "--bin=cli"]);
        assert_eq!(inv.command_line(), "cargo build --release --bin=cli");
    }

    #[test]
    fn test_status_succeeded() {
        assert!(CompileStatus::success().succeeded());
        assert!(!CompileStatus::failed(101).succeeded());
        assert!(!CompileStatus { exit_code: None }.succeeded());
    }

    #[cfg(unix)]
    #[test]
    fn test_cargo_compiler_reports_exit_code() {
        let mut compiler = CargoCompiler::new();

        let status = compiler.compile(&invocation("sh", &["-c", "exit 3"])).unwrap();
        assert_eq!(status.exit_code, Some(3));

        let status = compiler.compile(&invocation("true", &[])).unwrap();
        assert!(status.succeeded());
    }

    #[test]
    fn test_cargo_compiler_missing_program() {
        let mut compiler = CargoCompiler::new();

        let result = compiler.compile(&invocation("kiln-no-such-compiler", &[]));
        assert!(matches!(result, Err(BuildError::Spawn { .. })));
        assert!(result.unwrap_err().is_spawn_failure());
    }

    #[test]
    fn test_io_error_is_not_spawn_failure() {
        let error = BuildError::io("/tmp", std::io::Error::other("disk full"));
        assert!(!error.is_spawn_failure());
    }
}
