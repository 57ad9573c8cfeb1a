//! Loading the project file into a manifest for one version.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::core::errors::UsageError;
use crate::core::manifest::{Features, Manifest, ToolPaths};
use crate::core::project::{ProjectFile, PROJECT_FILE_NAME};

/// Settings shared by both invocation modes.
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    /// Path to the project file
    pub project: PathBuf,
    /// Requested version, or the project's default
    pub version: Option<String>,
    pub build_dir: Option<PathBuf>,
    pub tools: ToolPaths,
    pub features: Features,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        ManifestOptions {
            project: PathBuf::from(PROJECT_FILE_NAME),
            version: None,
            build_dir: None,
            tools: ToolPaths::default(),
            features: Features::default(),
        }
    }
}

impl ManifestOptions {
    /// Directory the project's relative paths are resolved against.
    pub fn root(&self) -> PathBuf {
        match self.project.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// The project file, relative to [`root`](Self::root).
    pub fn project_name(&self) -> PathBuf {
        self.project
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(PROJECT_FILE_NAME))
    }
}

/// Load, select the version, and validate.
///
/// An unknown version is reported before the manifest itself is validated.
pub fn load_manifest(opts: &ManifestOptions) -> Result<Manifest> {
    if !opts.project.is_file() {
        return Err(UsageError::ProjectNotFound {
            path: opts.project.clone(),
        }
        .into());
    }

    let project = ProjectFile::load(&opts.project)?;
    let versions = project.version_set()?;
    let version = versions.select(opts.version.as_deref())?;

    let mut builder = project
        .to_builder(versions, version)?
        .project_file(opts.project_name())
        .tools(opts.tools.clone())
        .features(opts.features.clone());
    if let Some(dir) = &opts.build_dir {
        builder = builder.build_dir(dir.clone());
    }

    let manifest = builder.build()?;
    info!(
        version = manifest.version().id(),
        libraries = manifest.libraries().len(),
        objects = manifest.object_count(),
        "loaded {}",
        opts.project.display()
    );
    Ok(manifest)
}

/// Resolve `path` against the project root unless it is absolute.
pub(crate) fn rooted(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
