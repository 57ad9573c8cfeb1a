//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser};

/// matchbuild - build and progress tooling for matching decompilations
#[derive(Parser)]
#[command(name = "matchbuild")]
#[command(author, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Mode to run: `configure` (default) or `progress`
    // Parsed by hand in `Mode::from_cli` so an unknown mode is a usage
    // error with exit status 2.
    pub mode: Option<String>,

    /// Version to configure (defaults to the first declared version)
    #[arg(short = 'v', long = "version", value_name = "VERSION")]
    pub game_version: Option<String>,

    /// Path to the project file
    #[arg(long, default_value = "project.toml")]
    pub project: PathBuf,

    /// Base build directory
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    #[command(flatten)]
    pub tools: ToolArgs,

    #[command(flatten)]
    pub features: FeatureArgs,

    #[command(flatten)]
    pub progress: ProgressArgs,
}

/// Paths to external tools. Unset tools fall back to the pinned build
/// directory layout or `PATH`.
#[derive(Args, Clone, Default)]
pub struct ToolArgs {
    /// Directory containing the assembler and linker binutils
    #[arg(long)]
    pub binutils: Option<PathBuf>,

    /// Directory containing the versioned compilers
    #[arg(long)]
    pub compilers: Option<PathBuf>,

    /// Path to the decomp toolkit binary
    #[arg(long)]
    pub dtk: Option<PathBuf>,

    /// Path to the diff tool binary
    #[arg(long)]
    pub objdiff: Option<PathBuf>,

    /// Path to the sjiswrap wrapper
    #[arg(long)]
    pub sjiswrap: Option<PathBuf>,

    /// Wrapper for running Windows binaries (wibo, wine)
    #[arg(long)]
    pub wrapper: Option<PathBuf>,

    /// Path to the ninja binary
    #[arg(long)]
    pub ninja: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
pub struct FeatureArgs {
    /// Generate a linker map file
    #[arg(long)]
    pub map: bool,

    /// Build with debug symbols
    #[arg(long)]
    pub debug: bool,

    /// Build and link equivalent code
    #[arg(long)]
    pub non_matching: bool,

    /// Compiler warning policy
    #[arg(long, value_name = "all|off|error")]
    pub warn: Option<String>,

    /// Do not add a progress step to the generated build
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Clone)]
pub struct ProgressArgs {
    /// Maximum concurrent differ queries
    #[arg(long, default_value = "8")]
    pub jobs: usize,

    /// Seconds to wait for each differ query
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Print the progress report as JSON
    #[arg(long)]
    pub json: bool,

    /// Read measurements from an existing differ report
    #[arg(long)]
    pub report: Option<PathBuf>,
}
