//! The project's enumerated set of buildable versions.

use std::fmt;

use crate::core::errors::{UsageError, ValidationError};

/// Ordered set of version identifiers. The first entry is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    versions: Vec<String>,
}

/// A version selected from a [`VersionSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedVersion {
    id: String,
    index: usize,
}

impl VersionSet {
    /// Create a version set, rejecting empty or duplicated lists.
    pub fn new<I, S>(versions: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for version in versions {
            let version: String = version.into();
            let version = version.trim().to_uppercase();
            if version.is_empty() {
                return Err(ValidationError::InvalidField {
                    field: "versions".to_string(),
                    message: "version identifiers must not be empty".to_string(),
                });
            }
            if out.contains(&version) {
                return Err(ValidationError::DuplicateVersion { version });
            }
            out.push(version);
        }

        if out.is_empty() {
            return Err(ValidationError::NoVersions);
        }

        Ok(VersionSet { versions: out })
    }

    /// Select a version by identifier (case-insensitive), or the default.
    pub fn select(&self, requested: Option<&str>) -> Result<SelectedVersion, UsageError> {
        let Some(requested) = requested else {
            return Ok(self.default_version());
        };

        let wanted = requested.trim().to_uppercase();
        self.versions
            .iter()
            .position(|v| *v == wanted)
            .map(|index| SelectedVersion { id: wanted, index })
            .ok_or_else(|| UsageError::UnknownVersion {
                version: requested.to_string(),
                allowed: self.versions.clone(),
            })
    }

    /// The first declared version.
    pub fn default_version(&self) -> SelectedVersion {
        SelectedVersion {
            id: self.versions.first().cloned().unwrap_or_default(),
            index: 0,
        }
    }

    pub fn contains(&self, version: &str) -> bool {
        let wanted = version.trim().to_uppercase();
        self.versions.iter().any(|v| *v == wanted)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.versions
    }
}

impl SelectedVersion {
    /// Version identifier, e.g. `GKYE`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position in the declared list, exported to code as `BUILD_VERSION`.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for SelectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
