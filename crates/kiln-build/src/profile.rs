//! Build profile selection
//!
//! The profile decides whether cargo is asked for an optimized build and which
//! output subdirectory the plugin libraries land in.

use serde::{Deserialize, Serialize};

/// Build profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Unoptimized development build
    Dev,
    /// Optimized build (default)
    #[default]
    Release,
}

impl Profile {
    /// Parse profile from its name, as written in kiln.toml
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dev" => Some(Self::Dev),
            "release" => Some(Self::Release),
            _ => None,
        }
    }

    /// Get profile name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Release => "release",
        }
    }

    /// Subdirectory of the cache directory cargo writes artifacts to
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            Self::Dev => "debug",
            Self::Release => "release",
        }
    }

    /// Extra cargo arguments selecting this profile
    pub fn cargo_args(&self) -> &'static [&'static str] {
        match self {
            Self::Dev => &[],
            Self::Release => &["--release"],
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
