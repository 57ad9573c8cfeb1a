//! Core data structures for matchbuild.
//!
//! This module contains the manifest model:
//! - Versions, modules, and match statuses
//! - Flag sets and their layering rules
//! - Libraries and objects, built through validating builders
//! - The project file schema that feeds them

pub mod errors;
pub mod flags;
pub mod library;
pub mod manifest;
pub mod module;
pub mod project;
pub mod status;
pub mod version;

pub use errors::{
    DifferQueryError, GraphError, ResolutionError, ToolchainConfigError, UsageError,
    ValidationError,
};
pub use flags::{FlagSet, WarnPolicy};
pub use library::{Library, LibraryBuilder, LibraryId, Object, ObjectSpec};
pub use manifest::{Features, Manifest, ManifestBuilder, ProgressCategory, ToolPaths};
pub use module::{ModuleDecl, ModuleId};
pub use project::{ProjectFile, PROJECT_FILE_NAME};
pub use status::{MatchStatus, ResolvedStatus};
pub use version::{SelectedVersion, VersionSet};
