//! Build-cache isolation for the plugin-library workspace
//!
//! The workspace cache lives under a hidden name between runs and is renamed to
//! the name cargo expects only while the workspace is being compiled.
//! [`CacheToggle::acquire`] returns a [`CacheGuard`] that hides the cache again on
//! every exit path.

use crate::error::{BuildError, BuildResult};
use kiln_config::CacheSection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which name the cache directory currently lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// No cache yet (first build)
    Absent,
    /// Under the name the compiler uses
    Visible,
    /// Under the between-runs name
    Hidden,
}

/// Renames a workspace build cache between its visible and hidden names
#[derive(Debug, Clone)]
pub struct CacheToggle {
    visible: PathBuf,
    hidden: PathBuf,
}

impl CacheToggle {
    /// Create a toggle for explicit visible and hidden paths
    pub fn new(visible: impl Into<PathBuf>, hidden: impl Into<PathBuf>) -> Self {
        Self {
            visible: visible.into(),
            hidden: hidden.into(),
        }
    }

    /// Create a toggle for the configured cache names inside `workspace`
    pub fn in_workspace(workspace: &Path, names: &CacheSection) -> Self {
        Self::new(workspace.join(&names.visible), workspace.join(&names.hidden))
    }

    /// Path of the visible cache directory
    pub fn visible_path(&self) -> &Path {
        &self.visible
    }

    /// Path of the hidden cache directory
    pub fn hidden_path(&self) -> &Path {
        &self.hidden
    }

    /// Inspect the filesystem for the current cache state
    pub fn state(&self) -> BuildResult<CacheState> {
        match (self.visible.exists(), self.hidden.exists()) {
            (false, false) => Ok(CacheState::Absent),
            (true, false) => Ok(CacheState::Visible),
            (false, true) => Ok(CacheState::Hidden),
            (true, true) => Err(BuildError::CacheConflict {
                visible: self.visible.clone(),
                hidden: self.hidden.clone(),
            }),
        }
    }

    /// Move a hidden cache to the visible name. No-op if there is no hidden cache.
    pub fn reveal(&self) -> BuildResult<()> {
        match self.state()? {
            CacheState::Hidden => rename(&self.hidden, &self.visible),
            CacheState::Visible | CacheState::Absent => Ok(()),
        }
    }

    /// Move a visible cache to the hidden name. No-op if there is no visible cache.
    pub fn hide(&self) -> BuildResult<()> {
        match self.state()? {
            CacheState::Visible => rename(&self.visible, &self.hidden),
            CacheState::Hidden | CacheState::Absent => Ok(()),
        }
    }

    /// Reveal the cache for the lifetime of the returned guard
    pub fn acquire(&self) -> BuildResult<CacheGuard<'_>> {
        self.reveal()?;
        Ok(CacheGuard {
            toggle: self,
            released: false,
        })
    }
}

fn rename(from: &Path, to: &Path) -> BuildResult<()> {
    tracing::debug!("renaming {} -> {}", from.display(), to.display());
    fs::rename(from, to).map_err(|e| BuildError::rename(from, to, e))
}

/// Keeps the cache visible until released or dropped
#[derive(Debug)]
#[must_use = "dropping the guard hides the cache immediately"]
pub struct CacheGuard<'a> {
    toggle: &'a CacheToggle,
    released: bool,
}

impl CacheGuard<'_> {
    /// Hide the cache and report the outcome
    pub fn release(mut self) -> BuildResult<()> {
        self.released = true;
        self.toggle.hide()
    }
}

impl Drop for CacheGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.toggle.hide() {
            tracing::warn!("failed to hide build cache: {}", e);
        }
    }
}
