//! Module identifiers and declarations.
//!
//! Module 0 is always the main executable image; every other id names a
//! separately linked overlay.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a separately linked image.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// The main executable image.
    pub const MAIN: ModuleId = ModuleId(0);

    /// Whether this is the main image.
    pub fn is_main(self) -> bool {
        self == Self::MAIN
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A module declared by the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// Module id (0 = main image)
    pub id: ModuleId,
    /// Short name, used for output paths and unit names
    pub name: String,
}

impl ModuleDecl {
    /// Create a module declaration.
    pub fn new(id: ModuleId, name: impl Into<String>) -> Self {
        ModuleDecl {
            id,
            name: name.into(),
        }
    }

    /// The implicit main-image declaration.
    pub fn main() -> Self {
        ModuleDecl::new(ModuleId::MAIN, "main")
    }
}
