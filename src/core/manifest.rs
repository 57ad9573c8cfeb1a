//! The validated, immutable project manifest.
//!
//! A [`Manifest`] describes every library, object, flag set, and module for
//! one selected version. It is only constructed through [`ManifestBuilder`],
//! which performs all validation up front; nothing mutates it afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::ValidationError;
use crate::core::flags::{FlagSet, WarnPolicy};
use crate::core::library::{check_warn_conflicts, Library, LibraryBuilder, LibraryId, Object};
use crate::core::module::{ModuleDecl, ModuleId};
use crate::core::status::ResolvedStatus;
use crate::core::version::{SelectedVersion, VersionSet};

/// Default build directory.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Default source directory.
pub const DEFAULT_SRC_DIR: &str = "src";

/// A progress reporting group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCategory {
    /// Short key referenced by libraries
    pub key: String,
    /// Human-readable label
    pub label: String,
}

impl ProgressCategory {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        ProgressCategory {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Feature toggles selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Features {
    /// Emit debug symbols
    pub debug: bool,
    /// Ask the linker for a map file
    pub generate_map: bool,
    /// Build and link equivalent code
    pub non_matching: bool,
    /// Compiler warning policy, if one was requested
    pub warn: Option<WarnPolicy>,
    /// Add a progress step to the generated build
    pub progress: bool,
    /// Break progress down per module
    pub progress_each_module: bool,
}

impl Default for Features {
    fn default() -> Self {
        Features {
            debug: false,
            generate_map: false,
            non_matching: false,
            warn: None,
            progress: true,
            progress_each_module: false,
        }
    }
}

/// Locations of external tools. Unset entries fall back to the project's
/// defaults under the build directory, then to `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pub binutils: Option<PathBuf>,
    pub compilers: Option<PathBuf>,
    pub dtk: Option<PathBuf>,
    pub objdiff: Option<PathBuf>,
    pub sjiswrap: Option<PathBuf>,
    pub wrapper: Option<PathBuf>,
    pub ninja: Option<PathBuf>,
}

/// Validated description of one configured version.
#[derive(Debug, Clone)]
pub struct Manifest {
    versions: VersionSet,
    version: SelectedVersion,
    project_file: Option<PathBuf>,
    build_dir: PathBuf,
    src_dir: PathBuf,
    cflags: FlagSet,
    asflags: FlagSet,
    ldflags: FlagSet,
    tools: ToolPaths,
    tool_tags: BTreeMap<String, String>,
    features: Features,
    linker_version: Option<String>,
    ldscript: Option<PathBuf>,
    config_path: Option<PathBuf>,
    check_sha: Option<PathBuf>,
    modules: Vec<ModuleDecl>,
    categories: Vec<ProgressCategory>,
    libraries: Vec<Library>,
    link_orders: BTreeMap<ModuleId, Vec<String>>,
    non_matching_extras: BTreeMap<ModuleId, Vec<String>>,
    reconfig_deps: Vec<PathBuf>,
    report_args: Vec<String>,
}

impl Manifest {
    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    pub fn version(&self) -> &SelectedVersion {
        &self.version
    }

    /// The project file this manifest was loaded from, if any.
    pub fn project_file(&self) -> Option<&Path> {
        self.project_file.as_deref()
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// `<build_dir>/<version>`, the root of all per-version outputs.
    pub fn version_dir(&self) -> PathBuf {
        self.build_dir.join(self.version.id())
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Global compiler flags, including version and feature flags.
    pub fn cflags(&self) -> &FlagSet {
        &self.cflags
    }

    pub fn asflags(&self) -> &FlagSet {
        &self.asflags
    }

    pub fn ldflags(&self) -> &FlagSet {
        &self.ldflags
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Pinned tool versions from the project file.
    pub fn tool_tags(&self) -> &BTreeMap<String, String> {
        &self.tool_tags
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn linker_version(&self) -> Option<&str> {
        self.linker_version.as_deref()
    }

    /// Linker script; defaults to the one the decomp toolkit generates.
    pub fn ldscript(&self) -> PathBuf {
        self.ldscript
            .clone()
            .unwrap_or_else(|| self.version_dir().join("ldscript.lcf"))
    }

    /// Decomp toolkit split configuration; defaults to `config/<version>/config.yml`.
    pub fn config_path(&self) -> PathBuf {
        self.config_path.clone().unwrap_or_else(|| {
            Path::new("config")
                .join(self.version.id())
                .join("config.yml")
        })
    }

    /// SHA-1 list the final image is checked against, if any.
    pub fn check_sha(&self) -> Option<&Path> {
        self.check_sha.as_deref()
    }

    /// Declared modules, ascending by id. Always contains the main image.
    pub fn modules(&self) -> &[ModuleDecl] {
        &self.modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&ModuleDecl> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn categories(&self) -> &[ProgressCategory] {
        &self.categories
    }

    pub fn category(&self, key: &str) -> Option<&ProgressCategory> {
        self.categories.iter().find(|c| c.key == key)
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn library(&self, id: LibraryId) -> &Library {
        &self.libraries[id.0]
    }

    /// Every object paired with its library, in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = (&Library, &Object)> {
        self.libraries
            .iter()
            .flat_map(|lib| lib.objects().iter().map(move |obj| (lib, obj)))
    }

    pub fn object_count(&self) -> usize {
        self.libraries.iter().map(|l| l.objects().len()).sum()
    }

    /// Status of `object` under this manifest's non-matching mode.
    pub fn resolved_status(&self, object: &Object) -> ResolvedStatus {
        object.status().resolve(self.features.non_matching)
    }

    /// Explicit link order configured for `module`, if any.
    pub fn link_order(&self, module: ModuleId) -> Option<&[String]> {
        self.link_orders.get(&module).map(Vec::as_slice)
    }

    /// Every explicit link order, by module.
    pub fn link_orders(&self) -> &BTreeMap<ModuleId, Vec<String>> {
        &self.link_orders
    }

    /// Objects appended to each module's link in non-matching builds.
    pub fn non_matching_extras(&self) -> &BTreeMap<ModuleId, Vec<String>> {
        &self.non_matching_extras
    }

    /// Extra files whose modification must trigger reconfiguration.
    pub fn reconfig_deps(&self) -> &[PathBuf] {
        &self.reconfig_deps
    }

    /// Extra arguments for the differ's report generator.
    pub fn report_args(&self) -> &[String] {
        &self.report_args
    }
}

/// Validating builder for [`Manifest`].
///
/// The version must already be selected: an unknown version is a usage
/// error and is reported before any manifest validation happens.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    versions: VersionSet,
    version: SelectedVersion,
    project_file: Option<PathBuf>,
    build_dir: PathBuf,
    src_dir: PathBuf,
    cflags: Vec<String>,
    asflags: Vec<String>,
    ldflags: Vec<String>,
    tools: ToolPaths,
    tool_tags: BTreeMap<String, String>,
    features: Features,
    linker_version: Option<String>,
    ldscript: Option<PathBuf>,
    config_path: Option<PathBuf>,
    check_sha: Option<PathBuf>,
    modules: Vec<ModuleDecl>,
    categories: Vec<ProgressCategory>,
    libraries: Vec<LibraryBuilder>,
    link_orders: Vec<(ModuleId, Vec<String>)>,
    non_matching_extras: Vec<(ModuleId, Vec<String>)>,
    reconfig_deps: Vec<PathBuf>,
    report_args: Vec<String>,
}

impl ManifestBuilder {
    pub fn new(versions: VersionSet, version: SelectedVersion) -> Self {
        ManifestBuilder {
            versions,
            version,
            project_file: None,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            src_dir: PathBuf::from(DEFAULT_SRC_DIR),
            cflags: Vec::new(),
            asflags: Vec::new(),
            ldflags: Vec::new(),
            tools: ToolPaths::default(),
            tool_tags: BTreeMap::new(),
            features: Features::default(),
            linker_version: None,
            ldscript: None,
            config_path: None,
            check_sha: None,
            modules: Vec::new(),
            categories: Vec::new(),
            libraries: Vec::new(),
            link_orders: Vec::new(),
            non_matching_extras: Vec::new(),
            reconfig_deps: Vec::new(),
            report_args: Vec::new(),
        }
    }

    pub fn project_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_file = Some(path.into());
        self
    }

    pub fn build_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.build_dir = path.into();
        self
    }

    pub fn src_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.src_dir = path.into();
        self
    }

    pub fn cflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn asflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn ldflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ldflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    pub fn tool_tag(mut self, tool: impl Into<String>, tag: impl Into<String>) -> Self {
        self.tool_tags.insert(tool.into(), tag.into());
        self
    }

    pub fn features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn linker_version(mut self, tag: impl Into<String>) -> Self {
        self.linker_version = Some(tag.into());
        self
    }

    pub fn ldscript(mut self, path: impl Into<PathBuf>) -> Self {
        self.ldscript = Some(path.into());
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn check_sha(mut self, path: impl Into<PathBuf>) -> Self {
        self.check_sha = Some(path.into());
        self
    }

    pub fn module(mut self, module: ModuleDecl) -> Self {
        self.modules.push(module);
        self
    }

    pub fn category(mut self, category: ProgressCategory) -> Self {
        self.categories.push(category);
        self
    }

    pub fn library(mut self, library: LibraryBuilder) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn link_order<I, S>(mut self, module: ModuleId, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.link_orders
            .push((module, order.into_iter().map(Into::into).collect()));
        self
    }

    /// Append `objects` to `module`'s link in non-matching builds.
    pub fn non_matching_extra<I, S>(mut self, module: ModuleId, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_matching_extras
            .push((module, objects.into_iter().map(Into::into).collect()));
        self
    }

    pub fn reconfig_dep(mut self, path: impl Into<PathBuf>) -> Self {
        self.reconfig_deps.push(path.into());
        self
    }

    pub fn report_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.report_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Validate everything and produce the manifest.
    pub fn build(self) -> Result<Manifest, ValidationError> {
        let warn = self.features.warn;
        check_warn_conflicts("flags.cflags", &self.cflags, warn)?;

        let modules = build_modules(self.modules)?;
        let categories = build_categories(self.categories)?;
        let category_keys: Vec<String> = categories.iter().map(|c| c.key.clone()).collect();

        let mut names = BTreeSet::new();
        let mut libraries = Vec::with_capacity(self.libraries.len());
        for (index, builder) in self.libraries.into_iter().enumerate() {
            if !names.insert(builder.name().to_string()) {
                return Err(ValidationError::DuplicateLibrary {
                    library: builder.name().to_string(),
                });
            }

            let library = builder.build(
                LibraryId(index),
                self.linker_version.as_deref(),
                warn,
            )?;

            for category in library.categories() {
                if !category_keys.contains(category) {
                    return Err(ValidationError::UnknownCategory {
                        library: library.name().to_string(),
                        category: category.clone(),
                        available: category_keys.clone(),
                    });
                }
            }

            if !modules.iter().any(|m| m.id == library.module()) {
                return Err(ValidationError::UnknownModule {
                    field: format!("libraries[{}].module", library.name()),
                    module: library.module(),
                });
            }

            debug!(
                library = library.name(),
                objects = library.objects().len(),
                "validated library"
            );
            libraries.push(library);
        }

        let link_orders = module_lists(&modules, self.link_orders, "link_order")?;
        let non_matching_extras =
            module_lists(&modules, self.non_matching_extras, "non_matching_extras")?;

        let version_include = self.build_dir.join(self.version.id()).join("include");
        let version_include = version_include.to_string_lossy().replace('\\', "/");
        let index = self.version.index();

        let mut cflags = FlagSet::new(self.cflags);
        cflags.push("-i include");
        cflags.push(format!("-i {}", version_include));
        cflags.push(format!("-DBUILD_VERSION={}", index));
        cflags.push(format!("-DVERSION_{}", self.version.id()));
        if self.features.debug {
            cflags.push("-sym on");
            cflags.push("-DDEBUG=1");
        } else {
            cflags.push("-DNDEBUG=1");
        }
        if let Some(policy) = warn {
            cflags.push(policy.as_flag());
        }

        let mut asflags = FlagSet::new(self.asflags);
        asflags.push("-I include");
        asflags.push(format!("-I {}", version_include));
        asflags.push(format!("--defsym BUILD_VERSION={}", index));

        let mut ldflags = FlagSet::new(self.ldflags);
        if self.features.generate_map {
            ldflags.push("-mapunused");
        }
        if self.features.debug {
            ldflags.push("-g");
        }

        Ok(Manifest {
            versions: self.versions,
            version: self.version,
            project_file: self.project_file,
            build_dir: self.build_dir,
            src_dir: self.src_dir,
            cflags,
            asflags,
            ldflags,
            tools: self.tools,
            tool_tags: self.tool_tags,
            features: self.features,
            linker_version: self.linker_version,
            ldscript: self.ldscript,
            config_path: self.config_path,
            check_sha: self.check_sha,
            modules,
            categories,
            libraries,
            link_orders,
            non_matching_extras,
            reconfig_deps: self.reconfig_deps,
            report_args: self.report_args,
        })
    }
}

fn build_modules(declared: Vec<ModuleDecl>) -> Result<Vec<ModuleDecl>, ValidationError> {
    let mut modules: BTreeMap<ModuleId, ModuleDecl> = BTreeMap::new();
    for module in declared {
        if module.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: format!("modules[{}].name", module.id),
                message: "module name must not be empty".to_string(),
            });
        }
        if modules.contains_key(&module.id) {
            return Err(ValidationError::DuplicateModule { module: module.id });
        }
        modules.insert(module.id, module);
    }
    modules
        .entry(ModuleId::MAIN)
        .or_insert_with(ModuleDecl::main);
    Ok(modules.into_values().collect())
}

/// Key per-module object lists by module, rejecting undeclared modules.
fn module_lists(
    modules: &[ModuleDecl],
    lists: Vec<(ModuleId, Vec<String>)>,
    field: &str,
) -> Result<BTreeMap<ModuleId, Vec<String>>, ValidationError> {
    let mut out = BTreeMap::new();
    for (module, list) in lists {
        if !modules.iter().any(|m| m.id == module) {
            return Err(ValidationError::UnknownModule {
                field: format!("modules[{}].{}", module, field),
                module,
            });
        }
        out.insert(module, list);
    }
    Ok(out)
}

fn build_categories(
    declared: Vec<ProgressCategory>,
) -> Result<Vec<ProgressCategory>, ValidationError> {
    let mut seen = BTreeSet::new();
    for category in &declared {
        if category.key.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "categories[].key".to_string(),
                message: "category key must not be empty".to_string(),
            });
        }
        if !seen.insert(category.key.as_str()) {
            return Err(ValidationError::DuplicateCategory {
                key: category.key.clone(),
            });
        }
    }
    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::ObjectSpec;
    use crate::core::status::MatchStatus;
    use crate::test_support::fixtures;

    fn versions() -> (VersionSet, SelectedVersion) {
        let set = VersionSet::new(["GAMEE", "GAMEJ"]).unwrap();
        let selected = set.select(Some("GAMEJ")).unwrap();
        (set, selected)
    }

    #[test]
    fn test_sample_manifest_builds() {
        let manifest = fixtures::sdk_game_manifest(false);
        assert_eq!(manifest.libraries().len(), 2);
        assert_eq!(manifest.object_count(), 5);
        assert_eq!(manifest.modules().len(), 1);
        assert!(manifest.modules()[0].id.is_main());
        assert_eq!(manifest.version_dir(), PathBuf::from("build/GAMEE"));
    }

    #[test]
    fn test_version_flags_derived() {
        let (set, selected) = versions();
        let manifest = ManifestBuilder::new(set, selected)
            .cflags(["-proc gekko"])
            .asflags(["-mgekko"])
            .build()
            .unwrap();

        assert_eq!(manifest.cflags().get("-DBUILD_VERSION"), Some("-DBUILD_VERSION=1"));
        assert_eq!(manifest.cflags().get("-DVERSION_GAMEJ"), Some("-DVERSION_GAMEJ"));
        assert_eq!(manifest.cflags().get("-DNDEBUG"), Some("-DNDEBUG=1"));
        assert!(manifest
            .cflags()
            .include_dirs()
            .contains(&PathBuf::from("build/GAMEJ/include")));
        assert_eq!(
            manifest.asflags().get("--defsym BUILD_VERSION"),
            Some("--defsym BUILD_VERSION=1")
        );
    }

    #[test]
    fn test_feature_flags_derived() {
        let (set, selected) = versions();
        let manifest = ManifestBuilder::new(set, selected)
            .features(Features {
                debug: true,
                generate_map: true,
                warn: Some(WarnPolicy::Error),
                ..Features::default()
            })
            .build()
            .unwrap();

        assert_eq!(manifest.cflags().get("-sym"), Some("-sym on"));
        assert_eq!(manifest.cflags().get("-DDEBUG"), Some("-DDEBUG=1"));
        assert_eq!(manifest.cflags().get("-DNDEBUG"), None);
        assert_eq!(manifest.cflags().get("-W"), Some("-W error"));
        assert_eq!(manifest.ldflags().as_slice(), &["-mapunused", "-g"]);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let (set, selected) = versions();
        let err = ManifestBuilder::new(set, selected)
            .linker_version("GC/1.3.2")
            .category(ProgressCategory::new("game", "Game Code"))
            .library(
                LibraryBuilder::new("Sdk")
                    .category("sdk")
                    .object(ObjectSpec::new(MatchStatus::Matching, "os/OSInit.c")),
            )
            .build()
            .unwrap_err();

        match err {
            ValidationError::UnknownCategory {
                library,
                category,
                available,
            } => {
                assert_eq!(library, "Sdk");
                assert_eq!(category, "sdk");
                assert_eq!(available, vec!["game".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_library_and_category_rejected() {
        let (set, selected) = versions();
        let err = ManifestBuilder::new(set.clone(), selected.clone())
            .linker_version("GC/1.3.2")
            .category(ProgressCategory::new("game", "Game Code"))
            .library(LibraryBuilder::new("Game").category("game"))
            .library(LibraryBuilder::new("Game").category("game"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateLibrary { .. }));

        let err = ManifestBuilder::new(set, selected)
            .category(ProgressCategory::new("game", "Game Code"))
            .category(ProgressCategory::new("game", "Game"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateCategory { .. }));
    }

    #[test]
    fn test_unknown_module_rejected() {
        let (set, selected) = versions();
        let err = ManifestBuilder::new(set, selected)
            .linker_version("GC/1.3.2")
            .category(ProgressCategory::new("game", "Game Code"))
            .library(LibraryBuilder::new("Stage").category("game").module(ModuleId(4)))
            .build()
            .unwrap_err();
        assert_eq!(err.field(), "libraries[Stage].module");
    }

    #[test]
    fn test_modules_sorted_with_implicit_main() {
        let (set, selected) = versions();
        let manifest = ManifestBuilder::new(set, selected)
            .module(ModuleDecl::new(ModuleId(2), "stage"))
            .module(ModuleDecl::new(ModuleId(1), "menu"))
            .build()
            .unwrap();
        let ids: Vec<u32> = manifest.modules().iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        let (set, selected) = versions();
        let err = ManifestBuilder::new(set, selected)
            .module(ModuleDecl::new(ModuleId(1), "menu"))
            .module(ModuleDecl::new(ModuleId(1), "menu2"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateModule { .. }));
    }

    #[test]
    fn test_global_warning_conflict_rejected() {
        let (set, selected) = versions();
        let err = ManifestBuilder::new(set, selected)
            .cflags(["-W all"])
            .features(Features {
                warn: Some(WarnPolicy::Off),
                ..Features::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err.field(), "flags.cflags");
    }

    #[test]
    fn test_equivalent_follows_mode() {
        for non_matching in [false, true] {
            let manifest = fixtures::equivalent_manifest(non_matching);
            let (_, obj) = manifest
                .objects()
                .find(|(_, o)| o.status() == MatchStatus::Equivalent)
                .unwrap();
            assert_eq!(
                manifest.resolved_status(obj).is_linkable(),
                non_matching
            );
        }
    }
}
