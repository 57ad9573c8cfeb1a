//! Progress aggregation.
//!
//! Differ queries run on a bounded worker pool and stream their results
//! over a channel to one accumulating thread, which is the only writer of
//! per-object results. The report is then folded from those results in
//! declaration order, so it does not depend on completion order.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::builder::rules::{ResolvedObject, RuleResolver};
use crate::core::errors::DifferQueryError;
use crate::core::manifest::Manifest;
use crate::core::module::ModuleId;
use crate::core::status::ResolvedStatus;
use crate::progress::differ::{Differ, UnitMeasures, UnitQuery};
use crate::progress::report::{
    CategoryProgress, ModuleProgress, ProgressReport, Totals, UnknownUnit,
};

/// Default number of concurrent differ queries.
pub const DEFAULT_JOBS: usize = 8;

/// Default per-object differ timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What the differ said about one object.
#[derive(Debug, Clone)]
pub enum Outcome {
    Measured(UnitMeasures),
    Unknown(DifferQueryError),
    /// Not queried because the run was cancelled
    Skipped,
}

/// Result for one object.
#[derive(Debug, Clone)]
pub struct UnitResult {
    /// Position in declaration order
    pub index: usize,
    pub unit: String,
    pub library: String,
    /// The single category this object counts towards
    pub category: String,
    pub module: ModuleId,
    pub status: ResolvedStatus,
    pub outcome: Outcome,
}

impl UnitResult {
    /// Counts this object adds to its groups.
    pub fn totals(&self) -> Totals {
        let matching = self.status == ResolvedStatus::Matching;
        let mut totals = Totals {
            matched_objects: usize::from(matching),
            total_objects: 1,
            ..Totals::default()
        };
        if let Outcome::Measured(UnitMeasures {
            total: Some(total),
            matched,
            ..
        }) = self.outcome
        {
            totals.total_units = total;
            totals.matched_units = if matching {
                total
            } else {
                matched.unwrap_or(0).min(total)
            };
        }
        totals
    }

    /// Whether the differ measured the object but had no size for it.
    pub fn is_unsized(&self) -> bool {
        matches!(self.outcome, Outcome::Measured(UnitMeasures { total: None, .. }))
    }

    /// One JSON object per result, as written to the journal.
    pub fn to_json(&self) -> serde_json::Value {
        let (outcome, detail) = match &self.outcome {
            Outcome::Measured(m) => (
                "measured",
                serde_json::json!({
                    "total": m.total,
                    "matched": m.matched,
                    "fuzzy_percent": m.fuzzy_percent,
                }),
            ),
            Outcome::Unknown(err) => ("unknown", serde_json::json!({ "reason": err.to_string() })),
            Outcome::Skipped => ("skipped", serde_json::Value::Null),
        };
        serde_json::json!({
            "unit": self.unit,
            "library": self.library,
            "category": self.category,
            "module": self.module,
            "status": self.status,
            "outcome": outcome,
            "detail": detail,
        })
    }
}

/// Receives results as they arrive, on the accumulating thread.
pub trait ResultSink {
    fn record(&mut self, result: &UnitResult) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Appends every result to a JSON-lines file as soon as it arrives, so
/// an interrupted run leaves its finished queries on disk.
pub struct JournalSink {
    writer: BufWriter<File>,
}

impl JournalSink {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::util::fs::ensure_dir(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create journal {}", path.display()))?;
        Ok(JournalSink {
            writer: BufWriter::new(file),
        })
    }
}

impl ResultSink for JournalSink {
    fn record(&mut self, result: &UnitResult) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &result.to_json())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// A finished (or cancelled) aggregation.
#[derive(Debug, Clone)]
pub struct ProgressRun {
    /// Every object's result, in declaration order
    pub results: Vec<UnitResult>,
    pub report: ProgressReport,
    pub cancelled: bool,
}

/// An object waiting to be queried.
struct Pending {
    query: UnitQuery,
    library: String,
    category: String,
    module: ModuleId,
    status: ResolvedStatus,
}

impl Pending {
    fn new(manifest: &Manifest, object: &ResolvedObject) -> Self {
        let library = manifest.library(object.library);
        Pending {
            query: UnitQuery {
                unit: object.unit_name.clone(),
                target: object.reference.clone(),
                base: (object.builds || !object.is_generated()).then(|| object.output.clone()),
            },
            library: library.name().to_string(),
            category: library.primary_category().to_string(),
            module: object.module,
            status: object.status,
        }
    }

    fn finish(&self, index: usize, outcome: Outcome) -> UnitResult {
        UnitResult {
            index,
            unit: self.query.unit.clone(),
            library: self.library.clone(),
            category: self.category.clone(),
            module: self.module,
            status: self.status,
            outcome,
        }
    }
}

/// Queries the differ for every object and aggregates the answers.
pub struct Aggregator<'a> {
    manifest: &'a Manifest,
    differ: &'a dyn Differ,
    jobs: usize,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
    sinks: Vec<Box<dyn ResultSink + Send + 'a>>,
}

impl<'a> Aggregator<'a> {
    pub fn new(manifest: &'a Manifest, differ: &'a dyn Differ) -> Self {
        Aggregator {
            manifest,
            differ,
            jobs: DEFAULT_JOBS,
            timeout: DEFAULT_TIMEOUT,
            cancel: Arc::new(AtomicBool::new(false)),
            sinks: Vec::new(),
        }
    }

    /// Cap on concurrent queries.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a cancellation flag. Once set, remaining objects are skipped.
    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn sink(mut self, sink: Box<dyn ResultSink + Send + 'a>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Query every object and build the report.
    pub fn run(self) -> Result<ProgressRun> {
        let manifest = self.manifest;
        let objects = RuleResolver::new(manifest).resolve_all()?;
        let pending: Vec<Pending> = objects.iter().map(|o| Pending::new(manifest, o)).collect();
        let total = pending.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("differ-{}", i))
            .build()
            .context("failed to start differ worker pool")?;

        info!(objects = total, jobs = self.jobs, "measuring progress");

        let differ = self.differ;
        let timeout = self.timeout;
        let cancel = Arc::clone(&self.cancel);
        let mut sinks = self.sinks;
        let (tx, rx) = mpsc::channel::<UnitResult>();

        let slots = thread::scope(|scope| {
            let accumulator = scope.spawn(move || -> Result<Vec<Option<UnitResult>>> {
                let mut slots: Vec<Option<UnitResult>> = (0..total).map(|_| None).collect();
                for result in rx {
                    for sink in sinks.iter_mut() {
                        sink.record(&result)?;
                    }
                    let index = result.index;
                    slots[index] = Some(result);
                }
                for sink in sinks.iter_mut() {
                    sink.finish()?;
                }
                Ok(slots)
            });

            pool.install(|| {
                pending
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (index, item)| {
                        let outcome = if cancel.load(Ordering::Relaxed) {
                            Outcome::Skipped
                        } else {
                            match differ.query(&item.query, timeout) {
                                Ok(measures) => Outcome::Measured(measures),
                                Err(err) => {
                                    warn!("{}", err);
                                    Outcome::Unknown(err)
                                }
                            }
                        };
                        // A closed channel means the accumulator already failed.
                        let _ = tx.send(item.finish(index, outcome));
                    });
            });

            accumulator
                .join()
                .map_err(|_| anyhow!("progress accumulator panicked"))?
        })?;

        let results: Vec<UnitResult> = slots
            .into_iter()
            .zip(&pending)
            .enumerate()
            .map(|(index, (slot, item))| slot.unwrap_or_else(|| item.finish(index, Outcome::Skipped)))
            .collect();

        let cancelled = self.cancel.load(Ordering::Relaxed)
            || results.iter().any(|r| matches!(r.outcome, Outcome::Skipped));
        let report = aggregate(manifest, &results, cancelled);

        debug!(cancelled, "progress run finished");
        Ok(ProgressRun {
            results,
            report,
            cancelled,
        })
    }
}

/// Fold per-object results into a report.
///
/// Each object counts towards exactly one category and its module; the
/// overall totals are the sum of the category totals.
pub fn aggregate(manifest: &Manifest, results: &[UnitResult], cancelled: bool) -> ProgressReport {
    let mut by_category: BTreeMap<&str, Totals> = BTreeMap::new();
    let mut by_module: BTreeMap<ModuleId, Totals> = BTreeMap::new();
    let mut flagged = Vec::new();
    let mut unknown = Vec::new();
    let mut skipped = Vec::new();

    for result in results {
        let totals = result.totals();
        by_category
            .entry(result.category.as_str())
            .or_default()
            .add(&totals);
        by_module.entry(result.module).or_default().add(&totals);

        match &result.outcome {
            Outcome::Measured(_) if result.is_unsized() => flagged.push(result.unit.clone()),
            Outcome::Measured(_) => {}
            Outcome::Unknown(err) => unknown.push(UnknownUnit {
                unit: result.unit.clone(),
                reason: err.to_string(),
            }),
            Outcome::Skipped => skipped.push(result.unit.clone()),
        }
    }

    let categories: Vec<CategoryProgress> = manifest
        .categories()
        .iter()
        .map(|c| CategoryProgress {
            key: c.key.clone(),
            label: c.label.clone(),
            totals: by_category.get(c.key.as_str()).copied().unwrap_or_default(),
        })
        .collect();

    let mut overall = Totals::default();
    for category in &categories {
        overall.add(&category.totals);
    }

    let modules = if manifest.features().progress_each_module {
        manifest
            .modules()
            .iter()
            .map(|m| ModuleProgress {
                id: m.id,
                name: m.name.clone(),
                totals: by_module.get(&m.id).copied().unwrap_or_default(),
            })
            .collect()
    } else {
        Vec::new()
    };

    if !flagged.is_empty() {
        warn!("{} object(s) have no size information", flagged.len());
    }

    ProgressReport {
        version: manifest.version().id().to_string(),
        overall,
        categories,
        modules,
        flagged,
        unknown,
        skipped,
        cancelled,
    }
}
