//! `project.toml` parsing and schema.
//!
//! The project file is the on-disk form of a manifest. It is deserialized
//! as-is, then lowered into a [`ManifestBuilder`] for one selected version;
//! all validation happens in the builders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::errors::ValidationError;
use crate::core::library::{LibraryBuilder, ObjectSpec};
use crate::core::manifest::{ManifestBuilder, ProgressCategory};
use crate::core::module::{ModuleDecl, ModuleId};
use crate::core::status::MatchStatus;
use crate::core::version::{SelectedVersion, VersionSet};
use crate::util::fs;

/// Default project file name.
pub const PROJECT_FILE_NAME: &str = "project.toml";

/// Raw project file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectFile {
    /// Buildable versions; the first is the default
    pub versions: Vec<String>,

    #[serde(default)]
    pub build_dir: Option<PathBuf>,

    #[serde(default)]
    pub src_dir: Option<PathBuf>,

    /// Pinned tool versions, e.g. `dtk = "1.4.1"`
    #[serde(default)]
    pub tools: BTreeMap<String, String>,

    #[serde(default)]
    pub flags: FlagsSection,

    /// Toolchain tag used for linking
    #[serde(default)]
    pub linker_version: Option<String>,

    #[serde(default)]
    pub ldscript: Option<PathBuf>,

    /// Split configuration for the decomp toolkit; `{version}` expands to
    /// the selected version
    #[serde(default)]
    pub config_path: Option<String>,

    /// SHA-1 list for the final image, as accepted by `dtk shasum -c`;
    /// `{version}` expands to the selected version
    #[serde(default)]
    pub check_sha: Option<String>,

    /// Extra files that trigger reconfiguration when changed
    #[serde(default)]
    pub reconfig_deps: Vec<PathBuf>,

    #[serde(default)]
    pub modules: Vec<ModuleSection>,

    #[serde(default)]
    pub categories: Vec<ProgressCategory>,

    #[serde(default)]
    pub libraries: Vec<LibrarySection>,

    #[serde(default)]
    pub progress: ProgressSection,
}

/// `[progress]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProgressSection {
    /// Extra arguments for `objdiff-cli report generate`
    #[serde(default)]
    pub report_args: Vec<String>,
}

/// `[flags]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlagsSection {
    #[serde(default)]
    pub cflags: Vec<String>,

    #[serde(default)]
    pub asflags: Vec<String>,

    #[serde(default)]
    pub ldflags: Vec<String>,

    /// Named compiler flag sets libraries can reference by name
    #[serde(default)]
    pub sets: BTreeMap<String, Vec<String>>,
}

/// `[[modules]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleSection {
    pub id: ModuleId,
    pub name: String,

    /// Explicit link order, by object path
    #[serde(default)]
    pub link_order: Option<Vec<String>>,

    /// Objects appended to the link in non-matching builds
    #[serde(default)]
    pub non_matching_extras: Vec<String>,
}

/// `[[libraries]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibrarySection {
    pub name: String,

    /// Compiler version tag, e.g. `GC/1.2.5n`
    #[serde(default)]
    pub toolchain: Option<String>,

    /// Name of a `[flags.sets]` entry
    #[serde(default)]
    pub flags: Option<String>,

    /// Flags layered over the named set
    #[serde(default)]
    pub cflags: Vec<String>,

    pub category: CategoryRef,

    #[serde(default)]
    pub module: ModuleId,

    #[serde(default)]
    pub objects: Vec<ObjectSection>,
}

/// A library's category: one key or several.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CategoryRef {
    One(String),
    Many(Vec<String>),
}

impl CategoryRef {
    pub fn keys(&self) -> Vec<String> {
        match self {
            CategoryRef::One(key) => vec![key.clone()],
            CategoryRef::Many(keys) => keys.clone(),
        }
    }
}

/// `objects` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectSection {
    pub path: String,
    pub status: StatusSpec,

    #[serde(default)]
    pub extra_cflags: Vec<String>,

    #[serde(default)]
    pub toolchain: Option<String>,
}

/// Declared status, either fixed or matching only for some versions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StatusSpec {
    Fixed(MatchStatus),
    MatchingFor { matching_for: Vec<String> },
}

impl StatusSpec {
    /// Status for the selected version.
    fn resolve(
        &self,
        versions: &VersionSet,
        selected: &SelectedVersion,
        library: &str,
        object: &str,
    ) -> Result<MatchStatus, ValidationError> {
        match self {
            StatusSpec::Fixed(status) => Ok(*status),
            StatusSpec::MatchingFor { matching_for } => {
                let mut matches = false;
                for version in matching_for {
                    if !versions.contains(version) {
                        return Err(ValidationError::UnknownMatchingVersion {
                            library: library.to_string(),
                            object: object.to_string(),
                            version: version.clone(),
                        });
                    }
                    matches |= version.trim().eq_ignore_ascii_case(selected.id());
                }
                Ok(if matches {
                    MatchStatus::Matching
                } else {
                    MatchStatus::NonMatching
                })
            }
        }
    }
}

impl ProjectFile {
    /// Load and parse a project file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let project: ProjectFile = toml::from_str(contents)?;
        Ok(project)
    }

    /// The declared version set.
    pub fn version_set(&self) -> Result<VersionSet, ValidationError> {
        VersionSet::new(self.versions.iter().cloned())
    }

    /// Lower into a manifest builder for `version`.
    ///
    /// Resolves flag set references and per-version statuses. Command-line
    /// settings are applied by the caller on the returned builder.
    pub fn to_builder(
        &self,
        versions: VersionSet,
        version: SelectedVersion,
    ) -> Result<ManifestBuilder, ValidationError> {
        let mut builder = ManifestBuilder::new(versions.clone(), version.clone())
            .cflags(self.flags.cflags.iter().cloned())
            .asflags(self.flags.asflags.iter().cloned())
            .ldflags(self.flags.ldflags.iter().cloned());

        if let Some(dir) = &self.build_dir {
            builder = builder.build_dir(dir.clone());
        }
        if let Some(dir) = &self.src_dir {
            builder = builder.src_dir(dir.clone());
        }
        if let Some(tag) = &self.linker_version {
            builder = builder.linker_version(tag.clone());
        }
        if let Some(script) = &self.ldscript {
            builder = builder.ldscript(script.clone());
        }
        if let Some(path) = &self.config_path {
            builder = builder.config_path(expand_version(path, &version));
        }
        if let Some(path) = &self.check_sha {
            builder = builder.check_sha(expand_version(path, &version));
        }
        for (tool, tag) in &self.tools {
            builder = builder.tool_tag(tool.clone(), tag.clone());
        }
        for dep in &self.reconfig_deps {
            builder = builder.reconfig_dep(dep.clone());
        }
        builder = builder.report_args(self.progress.report_args.iter().cloned());
        for category in &self.categories {
            builder = builder.category(category.clone());
        }
        for module in &self.modules {
            builder = builder.module(ModuleDecl::new(module.id, module.name.clone()));
            if let Some(order) = &module.link_order {
                builder = builder.link_order(module.id, order.iter().cloned());
            }
            if !module.non_matching_extras.is_empty() {
                builder = builder
                    .non_matching_extra(module.id, module.non_matching_extras.iter().cloned());
            }
        }

        for lib in &self.libraries {
            let mut cflags = match &lib.flags {
                Some(set) => self
                    .flags
                    .sets
                    .get(set)
                    .cloned()
                    .ok_or_else(|| ValidationError::UnknownFlagSet {
                        library: lib.name.clone(),
                        set: set.clone(),
                    })?,
                None => Vec::new(),
            };
            cflags.extend(lib.cflags.iter().cloned());

            let mut library = LibraryBuilder::new(lib.name.clone())
                .cflags(cflags)
                .module(lib.module);
            if let Some(tag) = &lib.toolchain {
                library = library.toolchain(tag.clone());
            }
            for key in lib.category.keys() {
                library = library.category(key);
            }

            for obj in &lib.objects {
                let status = obj.status.resolve(&versions, &version, &lib.name, &obj.path)?;
                let mut spec =
                    ObjectSpec::new(status, obj.path.clone()).with_cflags(obj.extra_cflags.clone());
                if let Some(tag) = &obj.toolchain {
                    spec = spec.with_toolchain(tag.clone());
                }
                library = library.object(spec);
            }

            builder = builder.library(library);
        }

        Ok(builder)
    }
}

fn expand_version(path: &str, version: &SelectedVersion) -> PathBuf {
    PathBuf::from(path.replace("{version}", version.id()))
}
