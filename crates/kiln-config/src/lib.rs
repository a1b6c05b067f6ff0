//! Kiln Configuration System
//!
//! Provides configuration for the kiln build pipeline:
//! - Pipeline configuration (kiln.toml at the repository root)
//! - Per-stage failure policies
//! - Configuration precedence and environment overrides
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Pipeline config (./kiln.toml)
//! 3. Environment variables (KILN_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use kiln_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod loader;
pub mod pipeline;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid path for '{field}': {path}")]
    InvalidPath { field: String, path: PathBuf },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// File name of the pipeline configuration
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use pipeline::{
    BuildSection, CacheSection, FailurePolicy, PipelineConfig, PolicySection, WorkspaceSection,
};
