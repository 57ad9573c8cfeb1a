//! Differ backends.
//!
//! A differ compares a reference object with its rebuilt counterpart and
//! reports sizes in whatever unit it measures (bytes of code for objdiff).
//! Sizes are never computed here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::core::errors::DifferQueryError;
use crate::util::process::{ProcessBuilder, TimedOutput};

/// What to compare for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitQuery {
    /// Differ key
    pub unit: String,
    /// Reference object
    pub target: PathBuf,
    /// Rebuilt object, when one is built
    pub base: Option<PathBuf>,
}

/// Sizes reported by the differ for one object.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnitMeasures {
    /// Total size, `None` when the differ has no size for the object
    pub total: Option<u64>,
    /// Portion of `total` that matches
    pub matched: Option<u64>,
    /// Fuzzy match percentage, 0 to 100
    pub fuzzy_percent: Option<f32>,
}

/// Answers per-object match queries.
pub trait Differ: Send + Sync {
    fn query(&self, query: &UnitQuery, timeout: Duration) -> Result<UnitMeasures, DifferQueryError>;
}

/// Measures as they appear in objdiff's JSON output.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawMeasures {
    #[serde(default, deserialize_with = "lenient_u64")]
    total_code: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    matched_code: Option<u64>,
    #[serde(default)]
    fuzzy_match_percent: Option<f32>,
}

impl From<RawMeasures> for UnitMeasures {
    fn from(raw: RawMeasures) -> Self {
        UnitMeasures {
            total: raw.total_code,
            matched: raw.matched_code,
            fuzzy_percent: raw.fuzzy_match_percent,
        }
    }
}

/// 64-bit counters are written as strings by objdiff's JSON encoder.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Runs the diff tool once per object.
#[derive(Debug, Clone)]
pub struct ProcessDiffer {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessDiffer {
    /// Default arguments ahead of the object paths.
    pub const DEFAULT_ARGS: &'static [&'static str] = &["diff", "--format", "json", "-o", "-"];

    pub fn new(program: impl Into<PathBuf>) -> Self {
        ProcessDiffer {
            program: program.into(),
            args: Self::DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            cwd: None,
        }
    }

    /// Run the tool from `dir`, which object paths are relative to.
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Replace the arguments placed before `-1 <target> [-2 <base>]`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self, query: &UnitQuery) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.program)
            .args(&self.args)
            .arg("-1")
            .arg(&query.target);
        if let Some(base) = &query.base {
            cmd = cmd.arg("-2").arg(base);
        }
        if let Some(dir) = &self.cwd {
            cmd = cmd.cwd(dir);
        }
        cmd
    }
}

impl Differ for ProcessDiffer {
    fn query(&self, query: &UnitQuery, timeout: Duration) -> Result<UnitMeasures, DifferQueryError> {
        let cmd = self.command(query);
        debug!(unit = %query.unit, command = %cmd.display_command(), "querying differ");

        let failed = |message: String| DifferQueryError::Failed {
            unit: query.unit.clone(),
            message,
        };

        let output = match cmd.exec_with_timeout(timeout) {
            Ok(TimedOutput::Completed(output)) => output,
            Ok(TimedOutput::TimedOut) => {
                return Err(DifferQueryError::Timeout {
                    unit: query.unit.clone(),
                    timeout,
                })
            }
            Err(err) => return Err(failed(format!("{:#}", err))),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.lines().last().unwrap_or("").trim().to_string();
            return Err(failed(if message.is_empty() {
                format!("exited with {}", output.status)
            } else {
                message
            }));
        }

        parse_measures(&query.unit, &output.stdout)
    }
}

/// Parse one diff result. Accepts the measures either at the top level or
/// under a `measures` key.
pub fn parse_measures(unit: &str, bytes: &[u8]) -> Result<UnitMeasures, DifferQueryError> {
    let malformed = |message: String| DifferQueryError::Malformed {
        unit: unit.to_string(),
        message,
    };
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
    let measures = value.get("measures").unwrap_or(&value);
    if !measures.is_object() {
        return Err(malformed("expected a JSON object".to_string()));
    }
    let raw: RawMeasures =
        serde_json::from_value(measures.clone()).map_err(|e| malformed(e.to_string()))?;
    Ok(raw.into())
}

/// Answers queries from a pre-generated objdiff report.
#[derive(Debug, Clone, Default)]
pub struct ReportDiffer {
    units: BTreeMap<String, UnitMeasures>,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(default)]
    units: Vec<RawReportUnit>,
}

#[derive(Debug, Deserialize)]
struct RawReportUnit {
    name: String,
    #[serde(default)]
    measures: Option<RawMeasures>,
}

impl ReportDiffer {
    /// Load `report.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse report {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let report: RawReport = serde_json::from_str(contents)?;
        let units = report
            .units
            .into_iter()
            .map(|u| (u.name, u.measures.unwrap_or_default().into()))
            .collect();
        Ok(ReportDiffer { units })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Differ for ReportDiffer {
    fn query(&self, query: &UnitQuery, _timeout: Duration) -> Result<UnitMeasures, DifferQueryError> {
        self.units
            .get(&query.unit)
            .copied()
            .ok_or_else(|| DifferQueryError::Missing {
                unit: query.unit.clone(),
            })
    }
}
