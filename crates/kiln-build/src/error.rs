/// Build system error types
use crate::targets::CompileTarget;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to launch compiler for {target}: {error}")]
    Spawn {
        target: CompileTarget,
        error: std::io::Error,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to rename {from} to {to}: {error}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: std::io::Error,
    },

    #[error("Build cache exists under both {visible} and {hidden}; remove one before building")]
    CacheConflict { visible: PathBuf, hidden: PathBuf },

    #[error("Invalid configuration: {0}")]
    Config(#[from] kiln_config::ConfigError),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a rename error
    pub fn rename(from: impl Into<PathBuf>, to: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
            error,
        }
    }

    /// Create a copy error
    pub fn copy(from: impl Into<PathBuf>, to: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Copy {
            from: from.into(),
            to: to.into(),
            error,
        }
    }

    /// Whether the compiler could not be started at all
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }
}
