//! Object match status and its resolution against the build mode.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Match status declared for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Bit-identical to the reference; always linked.
    Matching,
    /// Not yet bit-identical; never linked.
    NonMatching,
    /// Functionally equivalent; linked only in non-matching mode.
    Equivalent,
}

/// Status after applying the manifest's non-matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedStatus {
    Matching,
    NonMatching,
}

impl MatchStatus {
    /// Resolve against the manifest's non-matching mode.
    ///
    /// `Equivalent` becomes `Matching` only when `non_matching` is set.
    pub fn resolve(self, non_matching: bool) -> ResolvedStatus {
        match self {
            MatchStatus::Matching => ResolvedStatus::Matching,
            MatchStatus::NonMatching => ResolvedStatus::NonMatching,
            MatchStatus::Equivalent if non_matching => ResolvedStatus::Matching,
            MatchStatus::Equivalent => ResolvedStatus::NonMatching,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Matching => "matching",
            MatchStatus::NonMatching => "non_matching",
            MatchStatus::Equivalent => "equivalent",
        }
    }
}

impl ResolvedStatus {
    /// Whether objects with this status may be linked.
    pub fn is_linkable(self) -> bool {
        self == ResolvedStatus::Matching
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ResolvedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedStatus::Matching => f.write_str("matching"),
            ResolvedStatus::NonMatching => f.write_str("non_matching"),
        }
    }
}
