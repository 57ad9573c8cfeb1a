//! Shared utilities

pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod process;

pub use diagnostic::Diagnostic;
pub use process::ProcessBuilder;
