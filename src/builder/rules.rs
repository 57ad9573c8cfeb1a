//! Per-object rule resolution.
//!
//! Decides, for every object, which rule builds it, where its output goes,
//! which flags it gets, and whether it takes part in the link.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::errors::ResolutionError;
use crate::core::flags::FlagSet;
use crate::core::library::{Library, LibraryId, Object};
use crate::core::manifest::Manifest;
use crate::core::module::ModuleId;
use crate::core::status::ResolvedStatus;

/// Extensions handled by the C/C++ compiler.
pub const COMPILE_EXTENSIONS: &[&str] = &["c", "cp", "cpp", "cxx", "cc"];

/// Extensions handled by the assembler.
pub const ASSEMBLE_EXTENSIONS: &[&str] = &["s"];

/// Pre-built object files, linked as-is.
pub const PREBUILT_EXTENSIONS: &[&str] = &["o"];

/// How an object is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Compile,
    Assemble,
    /// The source is already an object file.
    Prebuilt,
}

impl Rule {
    /// Pick the rule for a source extension.
    pub fn for_extension(extension: &str) -> Option<Rule> {
        let extension = extension.to_ascii_lowercase();
        let ext = extension.as_str();
        if COMPILE_EXTENSIONS.contains(&ext) {
            Some(Rule::Compile)
        } else if ASSEMBLE_EXTENSIONS.contains(&ext) {
            Some(Rule::Assemble)
        } else if PREBUILT_EXTENSIONS.contains(&ext) {
            Some(Rule::Prebuilt)
        } else {
            None
        }
    }
}

/// An object with everything needed to build, link, and score it.
#[derive(Debug, Clone)]
pub struct ResolvedObject {
    pub library: LibraryId,
    /// Object path as declared
    pub name: String,
    pub module: ModuleId,
    /// `<module>/<path without extension>`, the differ's key
    pub unit_name: String,
    pub rule: Rule,
    pub status: ResolvedStatus,
    /// Compiler version tag
    pub toolchain: String,
    /// Fully layered flags (cflags for compiled, asflags for assembled)
    pub flags: FlagSet,
    pub source: PathBuf,
    /// The object file the link consumes
    pub output: PathBuf,
    /// Reference object extracted from the original binary
    pub reference: PathBuf,
    /// Whether a build target is emitted for this object
    pub builds: bool,
    /// Whether this object may appear in a link
    pub links: bool,
}

impl ResolvedObject {
    /// Whether the output is produced by the graph rather than on disk.
    pub fn is_generated(&self) -> bool {
        self.rule != Rule::Prebuilt
    }
}

/// Resolves objects against one manifest.
pub struct RuleResolver<'a> {
    manifest: &'a Manifest,
}

impl<'a> RuleResolver<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        RuleResolver { manifest }
    }

    /// Resolve one object.
    pub fn resolve(
        &self,
        library: &Library,
        object: &Object,
    ) -> Result<ResolvedObject, ResolutionError> {
        let manifest = self.manifest;
        let extension = object.extension().unwrap_or_default();
        let rule = Rule::for_extension(&extension).ok_or_else(|| {
            ResolutionError::UnknownExtension {
                library: library.name().to_string(),
                object: object.name().to_string(),
                extension: extension.clone(),
            }
        })?;

        let status = manifest.resolved_status(object);
        let non_matching = manifest.features().non_matching;

        let flags = match rule {
            Rule::Compile => manifest
                .cflags()
                .layer(library.cflags())
                .layer(object.extra_cflags()),
            Rule::Assemble => manifest.asflags().clone(),
            Rule::Prebuilt => FlagSet::default(),
        };

        let module_dir = self.module_dir(library.module());
        let stem = object.stem_path();
        let source = object.source_path(manifest.src_dir());
        let generated = object_path(module_dir.join("src").join(&stem));
        let output = match rule {
            Rule::Prebuilt => source.clone(),
            _ => generated,
        };

        let module_name = manifest
            .module(library.module())
            .map(|m| m.name.as_str())
            .unwrap_or("main");
        let unit_name = format!(
            "{}/{}",
            module_name,
            stem.to_string_lossy().replace('\\', "/")
        );

        let links = status.is_linkable();
        let builds = rule != Rule::Prebuilt && (links || non_matching);

        debug!(
            object = object.name(),
            %status,
            builds,
            links,
            "resolved object"
        );

        Ok(ResolvedObject {
            library: library.id(),
            name: object.name().to_string(),
            module: library.module(),
            unit_name,
            rule,
            status,
            toolchain: object.toolchain().unwrap_or(library.toolchain()).to_string(),
            flags,
            source,
            output,
            reference: object_path(module_dir.join("obj").join(stem)),
            builds,
            links,
        })
    }

    /// Resolve every object in declaration order.
    pub fn resolve_all(&self) -> Result<Vec<ResolvedObject>, ResolutionError> {
        self.manifest
            .objects()
            .map(|(lib, obj)| self.resolve(lib, obj))
            .collect()
    }

    /// Output root for a module: the version dir for the main image,
    /// `<version dir>/<module name>` for overlays.
    pub fn module_dir(&self, module: ModuleId) -> PathBuf {
        module_dir(self.manifest, module)
    }
}

/// Append `.o` without disturbing dots already in the file name.
fn object_path(stem: PathBuf) -> PathBuf {
    let mut path = stem.into_os_string();
    path.push(".o");
    PathBuf::from(path)
}

pub(crate) fn module_dir(manifest: &Manifest, module: ModuleId) -> PathBuf {
    let root = manifest.version_dir();
    if module.is_main() {
        return root;
    }
    match manifest.module(module) {
        Some(decl) => root.join(&decl.name),
        None => root.join(Path::new(&module.to_string())),
    }
}
