//! Libraries and the objects they own.

use std::path::{Path, PathBuf};

use crate::core::errors::ValidationError;
use crate::core::flags::{warn_policies, FlagSet, WarnPolicy};
use crate::core::module::ModuleId;
use crate::core::status::MatchStatus;

/// Index of a library within its manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LibraryId(pub usize);

/// A single translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    name: String,
    status: MatchStatus,
    extra_cflags: FlagSet,
    toolchain: Option<String>,
    library: LibraryId,
}

impl Object {
    /// Path as declared, relative to the source directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Flags layered over the library's flags for this object only.
    pub fn extra_cflags(&self) -> &FlagSet {
        &self.extra_cflags
    }

    /// Toolchain tag overriding the library's, if any.
    pub fn toolchain(&self) -> Option<&str> {
        self.toolchain.as_deref()
    }

    /// The owning library.
    pub fn library(&self) -> LibraryId {
        self.library
    }

    /// Source path under `src_dir`.
    pub fn source_path(&self, src_dir: &Path) -> PathBuf {
        src_dir.join(&self.name)
    }

    /// Declared path without its extension, used for unit names and outputs.
    pub fn stem_path(&self) -> PathBuf {
        Path::new(&self.name).with_extension("")
    }

    /// Lowercased source extension, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

/// A named group of objects sharing flags, toolchain, and categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    id: LibraryId,
    name: String,
    toolchain: String,
    cflags: FlagSet,
    categories: Vec<String>,
    module: ModuleId,
    objects: Vec<Object>,
}

impl Library {
    pub fn id(&self) -> LibraryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiler version tag, e.g. `GC/1.2.5n`.
    pub fn toolchain(&self) -> &str {
        &self.toolchain
    }

    /// Library flags, before layering over the global flags.
    pub fn cflags(&self) -> &FlagSet {
        &self.cflags
    }

    /// Progress categories; the first one receives this library's totals.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn primary_category(&self) -> &str {
        self.categories.first().map(String::as_str).unwrap_or_default()
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Objects in declaration (default link) order.
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.name == name)
    }
}

/// Declaration of an object prior to validation.
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub name: String,
    pub status: MatchStatus,
    pub extra_cflags: Vec<String>,
    pub toolchain: Option<String>,
}

impl ObjectSpec {
    pub fn new(status: MatchStatus, name: impl Into<String>) -> Self {
        ObjectSpec {
            name: name.into(),
            status,
            extra_cflags: Vec::new(),
            toolchain: None,
        }
    }

    pub fn with_cflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_cflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn with_toolchain(mut self, tag: impl Into<String>) -> Self {
        self.toolchain = Some(tag.into());
        self
    }
}

/// Validating builder for [`Library`].
#[derive(Debug, Clone)]
pub struct LibraryBuilder {
    name: String,
    toolchain: Option<String>,
    cflags: Vec<String>,
    categories: Vec<String>,
    module: ModuleId,
    objects: Vec<ObjectSpec>,
}

impl LibraryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        LibraryBuilder {
            name: name.into(),
            toolchain: None,
            cflags: Vec::new(),
            categories: Vec::new(),
            module: ModuleId::MAIN,
            objects: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn toolchain(mut self, tag: impl Into<String>) -> Self {
        self.toolchain = Some(tag.into());
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

    pub fn category(mut self, key: impl Into<String>) -> Self {
        self.categories.push(key.into());
        self
    }

    pub fn module(mut self, module: ModuleId) -> Self {
        self.module = module;
        self
    }

    pub fn object(mut self, spec: ObjectSpec) -> Self {
        self.objects.push(spec);
        self
    }

    pub fn objects(mut self, specs: impl IntoIterator<Item = ObjectSpec>) -> Self {
        self.objects.extend(specs);
        self
    }

    /// Validate and build the library.
    ///
    /// `default_toolchain` applies when neither the library nor an object
    /// names a tag; `warn` is the selected warning policy, which explicit
    /// `-W` flags must not contradict.
    pub fn build(
        self,
        id: LibraryId,
        default_toolchain: Option<&str>,
        warn: Option<WarnPolicy>,
    ) -> Result<Library, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "libraries[].name".to_string(),
                message: "library name must not be empty".to_string(),
            });
        }

        let toolchain = self
            .toolchain
            .or_else(|| default_toolchain.map(str::to_string))
            .ok_or_else(|| ValidationError::InvalidField {
                field: format!("libraries[{}].toolchain", self.name),
                message: "no toolchain tag and no `linker_version` to fall back on".to_string(),
            })?;

        if self.categories.is_empty() {
            return Err(ValidationError::MissingCategory { library: self.name });
        }

        check_warn_conflicts(
            &format!("libraries[{}].cflags", self.name),
            &self.cflags,
            warn,
        )?;

        let mut objects: Vec<Object> = Vec::with_capacity(self.objects.len());
        for spec in self.objects {
            if spec.name.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: format!("libraries[{}].objects", self.name),
                    message: "object path must not be empty".to_string(),
                });
            }
            if objects.iter().any(|o| o.name == spec.name) {
                return Err(ValidationError::DuplicateObject {
                    library: self.name,
                    object: spec.name,
                });
            }
            check_warn_conflicts(
                &format!("libraries[{}].objects[{}].cflags", self.name, spec.name),
                &spec.extra_cflags,
                warn,
            )?;

            objects.push(Object {
                name: spec.name,
                status: spec.status,
                extra_cflags: FlagSet::new(spec.extra_cflags),
                toolchain: spec.toolchain,
                library: id,
            });
        }

        Ok(Library {
            id,
            name: self.name,
            toolchain,
            cflags: FlagSet::new(self.cflags),
            categories: self.categories,
            module: self.module,
            objects,
        })
    }
}

/// Reject raw flag lists that request more than one warning policy, or a
/// policy other than the selected one.
pub(crate) fn check_warn_conflicts(
    field: &str,
    flags: &[String],
    selected: Option<WarnPolicy>,
) -> Result<(), ValidationError> {
    let mut seen = selected;
    for policy in warn_policies(flags.iter().map(String::as_str)) {
        match seen {
            Some(first) if first != policy => {
                return Err(ValidationError::ConflictingWarnings {
                    field: field.to_string(),
                    first: first.to_string(),
                    second: policy.to_string(),
                });
            }
            _ => seen = Some(policy),
        }
    }
    Ok(())
}
