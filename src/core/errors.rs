//! Error taxonomy for configuration and progress passes.
//!
//! Configuration-time errors ([`ValidationError`], [`ResolutionError`],
//! [`ToolchainConfigError`], [`UsageError`]) abort the run. [`DifferQueryError`]
//! is per-object and only ever degrades that object's contribution.

use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::module::ModuleId;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Malformed or contradictory project configuration.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ValidationError {
    #[error("project declares no versions")]
    #[diagnostic(code(matchbuild::manifest::no_versions))]
    NoVersions,

    #[error("version `{version}` is declared more than once")]
    #[diagnostic(code(matchbuild::manifest::duplicate_version))]
    DuplicateVersion { version: String },

    #[error("duplicate library `{library}`")]
    #[diagnostic(code(matchbuild::manifest::duplicate_library))]
    DuplicateLibrary { library: String },

    #[error("duplicate object `{object}` in library `{library}`")]
    #[diagnostic(
        code(matchbuild::manifest::duplicate_object),
        help("object filenames must be unique within a library")
    )]
    DuplicateObject { library: String, object: String },

    #[error("library `{library}` has no progress category")]
    #[diagnostic(code(matchbuild::manifest::missing_category))]
    MissingCategory { library: String },

    #[error("library `{library}` references unknown progress category `{category}`")]
    #[diagnostic(code(matchbuild::manifest::unknown_category))]
    UnknownCategory {
        library: String,
        category: String,
        available: Vec<String>,
    },

    #[error("duplicate progress category `{key}`")]
    #[diagnostic(code(matchbuild::manifest::duplicate_category))]
    DuplicateCategory { key: String },

    #[error("`{field}` references unknown module {module}")]
    #[diagnostic(code(matchbuild::manifest::unknown_module))]
    UnknownModule { field: String, module: ModuleId },

    #[error("duplicate module {module}")]
    #[diagnostic(code(matchbuild::manifest::duplicate_module))]
    DuplicateModule { module: ModuleId },

    #[error("library `{library}` references unknown flag set `{set}`")]
    #[diagnostic(code(matchbuild::manifest::unknown_flag_set))]
    UnknownFlagSet { library: String, set: String },

    #[error("conflicting warning policies in `{field}`: `{first}` and `{second}`")]
    #[diagnostic(
        code(matchbuild::manifest::conflicting_warnings),
        help("select a single policy with `--warn` and drop explicit `-W` flags")
    )]
    ConflictingWarnings {
        field: String,
        first: String,
        second: String,
    },

    #[error("object `{object}` in library `{library}` lists undeclared version `{version}`")]
    #[diagnostic(code(matchbuild::manifest::unknown_matching_version))]
    UnknownMatchingVersion {
        library: String,
        object: String,
        version: String,
    },

    #[error("invalid value for `{field}`: {message}")]
    #[diagnostic(code(matchbuild::manifest::invalid_field))]
    InvalidField { field: String, message: String },
}

impl ValidationError {
    /// Dotted path of the offending field in the project file.
    pub fn field(&self) -> String {
        match self {
            ValidationError::NoVersions | ValidationError::DuplicateVersion { .. } => {
                "versions".to_string()
            }
            ValidationError::DuplicateLibrary { library } => format!("libraries[{}]", library),
            ValidationError::DuplicateObject { library, object }
            | ValidationError::UnknownMatchingVersion {
                library, object, ..
            } => format!("libraries[{}].objects[{}]", library, object),
            ValidationError::MissingCategory { library }
            | ValidationError::UnknownCategory { library, .. } => {
                format!("libraries[{}].category", library)
            }
            ValidationError::DuplicateCategory { key } => format!("categories[{}]", key),
            ValidationError::UnknownModule { field, .. } => field.clone(),
            ValidationError::DuplicateModule { module } => format!("modules[{}]", module),
            ValidationError::UnknownFlagSet { library, .. } => {
                format!("libraries[{}].flags", library)
            }
            ValidationError::ConflictingWarnings { field, .. }
            | ValidationError::InvalidField { field, .. } => field.clone(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string())
            .with_context(format!("field: {}", self.field()));

        match self {
            ValidationError::UnknownCategory { available, .. } => {
                if !available.is_empty() {
                    diag = diag.with_context(format!(
                        "declared categories: {}",
                        available.join(", ")
                    ));
                }
                diag = diag.with_suggestion("add the category to the `[[categories]]` list");
            }
            ValidationError::DuplicateObject { .. } => {
                diag = diag.with_suggestion("remove or rename one of the entries");
            }
            ValidationError::ConflictingWarnings { .. } => {
                diag = diag.with_suggestion(
                    "select a single policy with `--warn` and drop explicit `-W` flags",
                );
            }
            _ => {}
        }

        diag
    }
}

/// An object or link order that cannot be turned into build rules.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ResolutionError {
    #[error("object `{object}` in library `{library}` has unrecognized extension `{extension}`")]
    #[diagnostic(code(matchbuild::rules::unknown_extension))]
    UnknownExtension {
        library: String,
        object: String,
        extension: String,
    },

    #[error("link order for module {module} references unknown object `{object}`")]
    #[diagnostic(code(matchbuild::link::unknown_object))]
    LinkOrderUnknownObject { module: ModuleId, object: String },

    #[error("link order for module {module} references `{object}`, which is not linkable")]
    #[diagnostic(code(matchbuild::link::ineligible_object))]
    LinkOrderIneligibleObject { module: ModuleId, object: String },

    #[error("link order for module {module} lists `{object}` more than once")]
    #[diagnostic(code(matchbuild::link::duplicate_object))]
    LinkOrderDuplicate { module: ModuleId, object: String },

    #[error("two targets produce `{}`", .output.display())]
    #[diagnostic(code(matchbuild::graph::duplicate_output))]
    DuplicateOutput { output: PathBuf },

    #[error("target `{}` depends on undeclared generated file `{}`", .target.display(), .input.display())]
    #[diagnostic(code(matchbuild::graph::undeclared_input))]
    UndeclaredInput { target: PathBuf, input: PathBuf },

    #[error("dependency cycle through `{}`", .output.display())]
    #[diagnostic(code(matchbuild::graph::cycle))]
    Cycle { output: PathBuf },
}

impl ResolutionError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ResolutionError::UnknownExtension { .. } => {
                diag.with_suggestion(suggestions::SOURCE_EXTENSION)
            }
            ResolutionError::LinkOrderUnknownObject { .. }
            | ResolutionError::LinkOrderIneligibleObject { .. } => {
                diag.with_suggestion(suggestions::LINK_ORDER)
            }
            ResolutionError::LinkOrderDuplicate { .. } => {
                diag.with_suggestion("an object may appear only once in a link order")
            }
            _ => diag,
        }
    }
}

/// A feature needs an external tool that was not configured.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ToolchainConfigError {
    #[error("{feature} requires `{tool}`, but no path was configured")]
    #[diagnostic(code(matchbuild::toolchain::missing_tool))]
    MissingTool { tool: &'static str, feature: String },

    #[error("{feature} requires `linker_version` to be set")]
    #[diagnostic(code(matchbuild::toolchain::missing_linker))]
    MissingLinkerVersion { feature: String },
}

impl ToolchainConfigError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ToolchainConfigError::MissingTool { tool, .. } => diag
                .with_suggestion(suggestions::MISSING_TOOL)
                .with_suggestion(format!("declare a `{}` tag under `[tools]`", tool)),
            ToolchainConfigError::MissingLinkerVersion { .. } => {
                diag.with_suggestion("set `linker_version` in the project file, e.g. \"GC/1.3.2\"")
            }
        }
    }
}

/// Graph compilation failure.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum GraphError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Toolchain(#[from] ToolchainConfigError),
}

impl GraphError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GraphError::Resolution(e) => e.to_diagnostic(),
            GraphError::Toolchain(e) => e.to_diagnostic(),
        }
    }
}

/// A single differ query failed. Never fatal.
#[derive(Debug, Clone, Error, MietteDiagnostic)]
pub enum DifferQueryError {
    #[error("differ timed out after {}s for `{unit}`", .timeout.as_secs())]
    #[diagnostic(code(matchbuild::differ::timeout))]
    Timeout { unit: String, timeout: Duration },

    #[error("differ failed for `{unit}`: {message}")]
    #[diagnostic(code(matchbuild::differ::failed))]
    Failed { unit: String, message: String },

    #[error("differ output for `{unit}` is malformed: {message}")]
    #[diagnostic(code(matchbuild::differ::malformed))]
    Malformed { unit: String, message: String },

    #[error("`{unit}` is missing from the differ report")]
    #[diagnostic(code(matchbuild::differ::missing))]
    Missing { unit: String },
}

/// Bad command-line mode, flag, or flag combination.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum UsageError {
    #[error("unknown version `{version}` (expected one of: {})", .allowed.join(", "))]
    #[diagnostic(code(matchbuild::usage::version))]
    UnknownVersion {
        version: String,
        allowed: Vec<String>,
    },

    #[error("unknown mode `{mode}` (expected `configure` or `progress`)")]
    #[diagnostic(code(matchbuild::usage::mode))]
    UnknownMode { mode: String },

    #[error("project file not found: {}", .path.display())]
    #[diagnostic(
        code(matchbuild::usage::project),
        help("pass `--project <FILE>` or run from the project root")
    )]
    ProjectNotFound { path: PathBuf },

    #[error("{message}")]
    #[diagnostic(code(matchbuild::usage::flags))]
    Conflict { message: String },
}

impl UsageError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            UsageError::ProjectNotFound { path } => diag
                .with_location(path.clone())
                .with_suggestion(suggestions::NO_PROJECT),
            _ => diag.with_suggestion("run with `--help` to see accepted values"),
        }
    }
}
