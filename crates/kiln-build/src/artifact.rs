//! Shared-library artifact classification
//!
//! Decides which files in a compiler output directory are plugin libraries and
//! computes the platform-neutral name they are staged under.

use serde::{Deserialize, Serialize};

/// Number of leading characters removed from unix-family library names.
///
/// Unix loaders expect a `lib` prefix; the strip is unconditional and applies
/// to whatever the first three characters are.
pub const LOADER_PREFIX_LEN: usize = 3;

/// Platform family of a dynamic library, recognized by filename suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryKind {
    /// Windows dynamic library (`.dll`)
    Windows,
    /// Unix shared object (`.so`)
    SharedObject,
    /// macOS dynamic library (any name ending in `dylib`)
    MacOs,
}

impl LibraryKind {
    /// All recognized kinds, in the order suffixes are tested
    pub fn all() -> [LibraryKind; 3] {
        [Self::Windows, Self::SharedObject, Self::MacOs]
    }

    /// Filename suffix for this kind
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".dll",
            Self::SharedObject => ".so",
            // No leading dot: `libfoodylib` matches too
            Self::MacOs => "dylib",
        }
    }

    /// Detect the kind from a filename
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|kind| file_name.ends_with(kind.suffix()))
    }

    /// Whether the loader prefix is stripped when staging
    pub fn strips_loader_prefix(&self) -> bool {
        matches!(self, Self::SharedObject | Self::MacOs)
    }
}

impl std::fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "windows dll"),
            Self::SharedObject => write!(f, "shared object"),
            Self::MacOs => write!(f, "dylib"),
        }
    }
}

/// A library file found in a compiler output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// File name, without directory
    pub file_name: String,
    /// Platform family
    pub kind: LibraryKind,
}

/// An artifact paired with the name it is staged under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedArtifact {
    pub source: ArtifactFile,
    pub staged_name: String,
}

/// Compute the staged name for a filename, or `None` if it is not a library.
///
/// ```
/// use kiln_build::classify;
///
/// assert_eq!(classify("libcore.so").as_deref(), Some("core.so"));
/// assert_eq!(classify("core.dll").as_deref(), Some("core.dll"));
/// assert_eq!(classify("notes.txt"), None);
/// ```
pub fn classify(file_name: &str) -> Option<String> {
    classify_artifact(file_name).map(|artifact| artifact.staged_name)
}

/// Classify a filename into a full [`StagedArtifact`]
pub fn classify_artifact(file_name: &str) -> Option<StagedArtifact> {
    let kind = LibraryKind::from_file_name(file_name)?;

    let staged_name = if kind.strips_loader_prefix() {
        strip_loader_prefix(file_name)?
    } else {
        file_name
    };

    Some(StagedArtifact {
        source: ArtifactFile {
            file_name: file_name.to_string(),
            kind,
        },
        staged_name: staged_name.to_string(),
    })
}

/// Drop the first [`LOADER_PREFIX_LEN`] characters; `None` if nothing would remain
fn strip_loader_prefix(file_name: &str) -> Option<&str> {
    let (offset, _) = file_name.char_indices().nth(LOADER_PREFIX_LEN)?;
    Some(&file_name[offset..])
}
