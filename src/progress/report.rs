//! Progress report types and rendering.

use std::fmt::Write as _;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::core::module::ModuleId;

/// Matched and total counts for one group of objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub matched_objects: usize,
    pub total_objects: usize,
    /// In the differ's size unit
    pub matched_units: u64,
    pub total_units: u64,
}

impl Totals {
    /// Percentage of units matched, or of objects when nothing was sized.
    pub fn percent(&self) -> f64 {
        if self.total_units > 0 {
            self.matched_units as f64 * 100.0 / self.total_units as f64
        } else {
            self.object_percent()
        }
    }

    pub fn object_percent(&self) -> f64 {
        if self.total_objects == 0 {
            0.0
        } else {
            self.matched_objects as f64 * 100.0 / self.total_objects as f64
        }
    }

    pub(crate) fn add(&mut self, other: &Totals) {
        self.matched_objects += other.matched_objects;
        self.total_objects += other.total_objects;
        self.matched_units += other.matched_units;
        self.total_units += other.total_units;
    }
}

impl Serialize for Totals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Totals", 5)?;
        state.serialize_field("matched_objects", &self.matched_objects)?;
        state.serialize_field("total_objects", &self.total_objects)?;
        state.serialize_field("matched_units", &self.matched_units)?;
        state.serialize_field("total_units", &self.total_units)?;
        state.serialize_field("percent", &self.percent())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub key: String,
    pub label: String,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleProgress {
    pub id: ModuleId,
    pub name: String,
    pub totals: Totals,
}

/// An object whose differ query failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownUnit {
    pub unit: String,
    pub reason: String,
}

/// Aggregated progress for one version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub version: String,
    pub overall: Totals,
    pub categories: Vec<CategoryProgress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleProgress>,
    /// Objects the differ had no size for
    pub flagged: Vec<String>,
    pub unknown: Vec<UnknownUnit>,
    /// Objects never queried because the run was cancelled
    pub skipped: Vec<String>,
    pub cancelled: bool,
}

impl ProgressReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Progress ({}):", self.version);
        let _ = writeln!(out, "  {}", line("All", &self.overall));
        for category in &self.categories {
            let _ = writeln!(out, "  {}", line(&category.label, &category.totals));
        }

        if !self.modules.is_empty() {
            let _ = writeln!(out, "  Modules:");
            for module in &self.modules {
                let _ = writeln!(out, "    {}", line(&module.name, &module.totals));
            }
        }

        if !self.flagged.is_empty() {
            let _ = writeln!(
                out,
                "  {} without size information: {}",
                plural(self.flagged.len()),
                self.flagged.join(", ")
            );
        }

        if !self.unknown.is_empty() {
            let _ = writeln!(out, "  {} could not be measured:", plural(self.unknown.len()));
            for unknown in &self.unknown {
                let _ = writeln!(out, "    {}: {}", unknown.unit, unknown.reason);
            }
        }

        if self.cancelled {
            let _ = writeln!(
                out,
                "  cancelled; {} not measured",
                plural(self.skipped.len())
            );
        }

        out
    }
}

fn line(label: &str, totals: &Totals) -> String {
    format!(
        "{}: {:.2}% matched ({} / {} units), {} / {} objects",
        label,
        totals.percent(),
        totals.matched_units,
        totals.total_units,
        totals.matched_objects,
        totals.total_objects,
    )
}

fn plural(count: usize) -> String {
    if count == 1 {
        "1 object".to_string()
    } else {
        format!("{} objects", count)
    }
}
