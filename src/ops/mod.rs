//! High-level operations.
//!
//! One module per invocation mode, plus the project loading they share.

pub mod configure;
pub mod manifest;
pub mod progress;

pub use configure::{configure, ConfigureOptions, ConfigureResult};
pub use manifest::{load_manifest, ManifestOptions};
pub use progress::{progress, ProgressOptions};
