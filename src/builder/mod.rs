//! Build graph generation.
//!
//! Resolves objects into rules, compiles them into a target graph, and
//! writes the graph out for ninja alongside the differ's metadata.

pub mod graph;
pub mod link_order;
pub mod metadata;
pub mod ninja;
pub mod rules;
pub mod toolchain;

pub use graph::{BuildGraph, BuildTarget, GraphCompiler, TargetKind};
pub use link_order::LinkOrderStrategy;
pub use metadata::ProjectMetadata;
pub use ninja::NinjaWriter;
pub use rules::{ResolvedObject, Rule, RuleResolver};
pub use toolchain::{CommandSpec, Toolchain};
