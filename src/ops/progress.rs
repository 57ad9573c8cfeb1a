//! Implementation of `matchbuild progress`.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::toolchain::Toolchain;
use crate::ops::manifest::{load_manifest, rooted, ManifestOptions};
use crate::progress::aggregate::{
    Aggregator, JournalSink, ProgressRun, ResultSink, UnitResult, DEFAULT_JOBS, DEFAULT_TIMEOUT,
};
use crate::progress::differ::{Differ, ProcessDiffer, ReportDiffer};

/// Per-object results of the last run, inside the version directory.
pub const JOURNAL_FILE_NAME: &str = "progress.jsonl";

/// Options for the progress command.
#[derive(Debug, Clone)]
pub struct ProgressOptions {
    pub manifest: ManifestOptions,

    /// Answer from an existing differ report instead of running the differ
    pub report: Option<PathBuf>,

    /// Concurrent differ queries
    pub jobs: usize,

    /// Per-object differ timeout
    pub timeout: Duration,

    /// Show a progress bar while querying
    pub show_bar: bool,

    /// Set to stop querying; finished results are kept
    pub cancel: Arc<AtomicBool>,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        ProgressOptions {
            manifest: ManifestOptions::default(),
            report: None,
            jobs: DEFAULT_JOBS,
            timeout: DEFAULT_TIMEOUT,
            show_bar: false,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Measure matching progress for the selected version.
pub fn progress(opts: &ProgressOptions) -> Result<ProgressRun> {
    let manifest = load_manifest(&opts.manifest)?;
    let root = opts.manifest.root();

    let differ: Box<dyn Differ> = match &opts.report {
        Some(path) => Box::new(ReportDiffer::load(path)?),
        None => {
            let program = Toolchain::locate(&manifest).differ("progress reporting")?;
            Box::new(ProcessDiffer::new(program).with_cwd(&root))
        }
    };

    let journal = rooted(&root, &manifest.version_dir().join(JOURNAL_FILE_NAME));
    let mut aggregator = Aggregator::new(&manifest, differ.as_ref())
        .jobs(opts.jobs)
        .timeout(opts.timeout)
        .cancel_flag(Arc::clone(&opts.cancel))
        .sink(Box::new(JournalSink::create(&journal)?));

    if opts.show_bar && manifest.object_count() > 1 {
        aggregator = aggregator.sink(Box::new(BarSink::new(manifest.object_count() as u64)));
    }

    aggregator.run()
}

/// Ticks a progress bar as results arrive.
struct BarSink {
    pb: ProgressBar,
}

impl BarSink {
    fn new(total: u64) -> Self {
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        BarSink { pb }
    }
}

impl ResultSink for BarSink {
    fn record(&mut self, result: &UnitResult) -> Result<()> {
        self.pb.set_message(result.unit.clone());
        self.pb.inc(1);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.pb.finish_and_clear();
        Ok(())
    }
}
