//! Kiln build orchestration
//!
//! Builds a toolchain made of a CLI front-end, a workspace of plugin libraries
//! and an installer:
//! - Sequential build pipeline with per-stage failure policies
//! - Shared-library discovery and platform-neutral renaming
//! - Staging of plugin libraries for the CLI to load at runtime
//! - Build-cache isolation for the plugin workspace

pub mod artifact;
pub mod cache;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod profile;
pub mod stage;
pub mod targets;

// Re-export main types
pub use artifact::{classify, classify_artifact, ArtifactFile, LibraryKind, StagedArtifact};
pub use cache::{CacheGuard, CacheState, CacheToggle};
pub use error::{BuildError, BuildResult};
pub use layout::PipelineLayout;
pub use orchestrator::{BuildReport, Orchestrator, PipelineState, StageOutcome, StageStatus};
pub use profile::Profile;
pub use stage::{ensure_and_copy, StageDirectory};
pub use targets::{CargoCompiler, CompileInvocation, CompileStatus, CompileTarget, Compiler};

// Re-export kiln-config types for convenience
pub use kiln_config::{FailurePolicy, PolicySection};
