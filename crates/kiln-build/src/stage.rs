//! Staging directory management
//!
//! Copies classified plugin libraries out of a compiler output directory into
//! the staging directory the CLI tool loads them from.

use crate::artifact::{classify_artifact, StagedArtifact};
use crate::error::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The canonical directory staged libraries are collected in
#[derive(Debug, Clone)]
pub struct StageDirectory {
    dir: PathBuf,
}

impl StageDirectory {
    /// Create a handle for the staging directory at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Staging directory path
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Create the directory (and parents) if missing
    pub fn ensure(&self) -> BuildResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| BuildError::io(&self.dir, e))
    }

    /// Stage every library found directly in `source_dir`.
    ///
    /// Entries are processed in file name order and copied one at a time,
    /// overwriting files of the same staged name. On error, files copied
    /// before the failure stay in place.
    pub fn stage_from(&self, source_dir: &Path) -> BuildResult<Vec<StagedArtifact>> {
        self.ensure()?;

        let mut staged = Vec::new();

        let entries = WalkDir::new(source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            let entry = entry.map_err(|e| walk_error(source_dir, e))?;

            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };

            let Some(artifact) = classify_artifact(file_name) else {
                continue;
            };

            // Follows symlinks; skips dangling links and dirs like deps/ or build/
            if !entry.path().is_file() {
                continue;
            }

            let from = entry.path();
            let to = self.dir.join(&artifact.staged_name);
            fs::copy(from, &to).map_err(|e| BuildError::copy(from, &to, e))?;
            tracing::debug!("staged {} as {}", file_name, artifact.staged_name);

            staged.push(artifact);
        }

        Ok(staged)
    }

    /// Sorted names of the files currently in the staging directory
    pub fn staged_files(&self) -> BuildResult<Vec<String>> {
        let mut names = Vec::new();

        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| walk_error(&self.dir, e))?;
            if entry.file_type().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Map a walk failure to the entry it happened on, falling back to the walk root
fn walk_error(root: &Path, error: walkdir::Error) -> BuildError {
    let path = error.path().unwrap_or(root).to_path_buf();
    BuildError::io(path, error.into())
}

/// Create `dest_dir` if needed and stage every library in `source_dir` into it
pub fn ensure_and_copy(source_dir: &Path, dest_dir: &Path) -> BuildResult<Vec<StagedArtifact>> {
    StageDirectory::new(dest_dir).stage_from(source_dir)
}
