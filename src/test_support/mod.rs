//! Test utilities and mocks for matchbuild unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use matchbuild::test_support::{fixtures, MockDiffer};
//!
//! #[test]
//! fn test_example() {
//!     let manifest = fixtures::sdk_game_manifest(false);
//!     let differ = MockDiffer::uniform(100).failing("main/os/OSCache");
//!     // Aggregate against the mock...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::errors::DifferQueryError;
use crate::progress::differ::{Differ, UnitMeasures, UnitQuery};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Canned answer for one unit.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Measures(UnitMeasures),
    Fail(String),
    Timeout,
}

/// Differ that answers from a table instead of running a tool.
///
/// Units without an entry get the default response. Every query is
/// recorded so tests can check what was asked.
#[derive(Debug)]
pub struct MockDiffer {
    responses: HashMap<String, MockResponse>,
    default: MockResponse,
    calls: Mutex<Vec<String>>,
    answered: AtomicUsize,
    cancel: Option<(usize, Arc<AtomicBool>)>,
}

impl MockDiffer {
    /// Every unit has `size` units of code, none matched.
    pub fn uniform(size: u64) -> Self {
        MockDiffer {
            responses: HashMap::new(),
            default: MockResponse::Measures(UnitMeasures {
                total: Some(size),
                matched: Some(0),
                fuzzy_percent: Some(0.0),
            }),
            calls: Mutex::new(Vec::new()),
            answered: AtomicUsize::new(0),
            cancel: None,
        }
    }

    pub fn respond(mut self, unit: &str, response: MockResponse) -> Self {
        self.responses.insert(unit.to_string(), response);
        self
    }

    pub fn with_size(self, unit: &str, total: u64) -> Self {
        self.with_partial(unit, total, 0)
    }

    pub fn with_partial(self, unit: &str, total: u64, matched: u64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            matched as f32 * 100.0 / total as f32
        };
        self.respond(
            unit,
            MockResponse::Measures(UnitMeasures {
                total: Some(total),
                matched: Some(matched),
                fuzzy_percent: Some(percent),
            }),
        )
    }

    pub fn without_size(self, unit: &str) -> Self {
        self.respond(unit, MockResponse::Measures(UnitMeasures::default()))
    }

    pub fn failing(self, unit: &str) -> Self {
        self.respond(unit, MockResponse::Fail("differ crashed".to_string()))
    }

    pub fn timing_out(self, unit: &str) -> Self {
        self.respond(unit, MockResponse::Timeout)
    }

    /// Set `flag` once `count` queries have been answered.
    pub fn cancel_after(mut self, count: usize, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some((count, flag));
        self
    }

    /// Units queried so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Differ for MockDiffer {
    fn query(&self, query: &UnitQuery, timeout: Duration) -> Result<UnitMeasures, DifferQueryError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.unit.clone());
        }

        let response = self.responses.get(&query.unit).unwrap_or(&self.default);
        let result = match response {
            MockResponse::Measures(measures) => Ok(*measures),
            MockResponse::Fail(message) => Err(DifferQueryError::Failed {
                unit: query.unit.clone(),
                message: message.clone(),
            }),
            MockResponse::Timeout => Err(DifferQueryError::Timeout {
                unit: query.unit.clone(),
                timeout,
            }),
        };

        let answered = self.answered.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, flag)) = &self.cancel {
            if answered >= *count {
                flag.store(true, Ordering::SeqCst);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn query(unit: &str) -> UnitQuery {
        UnitQuery {
            unit: unit.to_string(),
            target: PathBuf::from("obj/a.o"),
            base: None,
        }
    }

    #[test]
    fn test_mock_differ_table() {
        let differ = MockDiffer::uniform(10)
            .with_partial("b", 20, 5)
            .failing("c");

        let a = differ.query(&query("a"), Duration::from_secs(1)).unwrap();
        assert_eq!(a.total, Some(10));
        let b = differ.query(&query("b"), Duration::from_secs(1)).unwrap();
        assert_eq!(b.matched, Some(5));
        assert!(differ.query(&query("c"), Duration::from_secs(1)).is_err());
        assert_eq!(differ.calls(), vec!["a", "b", "c"]);
    }
}
