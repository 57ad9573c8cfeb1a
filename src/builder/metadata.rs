//! `objdiff.json` generation.
//!
//! Describes every object as a diff unit so the differ can pair the
//! reference object with the rebuilt one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::graph::BuildGraph;
use crate::builder::ninja::BUILD_FILE_NAME;
use crate::core::manifest::Manifest;
use crate::core::status::MatchStatus;
use crate::util::fs::slash_path;

/// Default metadata file name.
pub const METADATA_FILE_NAME: &str = "objdiff.json";

/// Oldest differ release that understands this layout.
const MIN_DIFFER_VERSION: &str = "2.0.0-beta.5";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub min_version: String,
    /// Command the differ runs to rebuild objects
    pub custom_make: String,
    pub custom_args: Vec<String>,
    pub build_target: bool,
    pub units: Vec<UnitMetadata>,
    pub progress_categories: Vec<CategoryMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMetadata {
    /// Differ key, `<module>/<path without extension>`
    pub name: String,
    pub target_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    pub metadata: UnitDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDetails {
    /// Whether the unit counts as matched
    pub complete: bool,
    pub source_path: String,
    pub progress_categories: Vec<String>,
    pub module: u32,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetadata {
    pub id: String,
    pub name: String,
}

impl ProjectMetadata {
    /// Collect metadata for every object in `graph`.
    pub fn from_graph(manifest: &Manifest, graph: &BuildGraph, ninja: &Path) -> Self {
        let units = graph
            .objects()
            .iter()
            .map(|object| {
                let library = manifest.library(object.library);
                let status = library
                    .object(&object.name)
                    .map(|o| o.status())
                    .unwrap_or(MatchStatus::NonMatching);
                UnitMetadata {
                    name: object.unit_name.clone(),
                    target_path: slash_path(&object.reference),
                    base_path: (object.builds || !object.is_generated())
                        .then(|| slash_path(&object.output)),
                    metadata: UnitDetails {
                        complete: object.links,
                        source_path: slash_path(&object.source),
                        progress_categories: library.categories().to_vec(),
                        module: object.module.0,
                        status,
                    },
                }
            })
            .collect();

        let progress_categories = manifest
            .categories()
            .iter()
            .map(|c| CategoryMetadata {
                id: c.key.clone(),
                name: c.label.clone(),
            })
            .collect();

        ProjectMetadata {
            min_version: MIN_DIFFER_VERSION.to_string(),
            custom_make: slash_path(ninja),
            custom_args: vec!["-f".to_string(), BUILD_FILE_NAME.to_string()],
            build_target: false,
            units,
            progress_categories,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}
