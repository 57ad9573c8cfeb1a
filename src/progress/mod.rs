//! Matching progress: differ queries, aggregation, and reporting.

pub mod aggregate;
pub mod differ;
pub mod report;

pub use aggregate::{aggregate, Aggregator, Outcome, ProgressRun, ResultSink, UnitResult};
pub use differ::{Differ, ProcessDiffer, ReportDiffer, UnitMeasures, UnitQuery};
pub use report::{ProgressReport, Totals};
