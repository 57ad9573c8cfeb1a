//! matchbuild - build graph and progress tooling for matching decompilations
//!
//! This crate turns a versioned project manifest (libraries, objects, and
//! their match status) into a ninja build graph, and aggregates per-object
//! differ results into matching progress.

pub mod builder;
pub mod core;
pub mod ops;
pub mod progress;
pub mod util;

/// Test utilities and mocks for matchbuild unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides manifest fixtures and a table-driven differ.
#[cfg(test)]
pub mod test_support;

pub use core::{Manifest, ManifestBuilder, MatchStatus, ModuleId};
pub use progress::{ProgressReport, ProgressRun};
