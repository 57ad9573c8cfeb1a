//! matchbuild CLI - configure a matching decompilation build, or measure it

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;
use commands::Mode;
use matchbuild::core::errors::{
    GraphError, ResolutionError, ToolchainConfigError, UsageError, ValidationError,
};
use matchbuild::util::diagnostic::emit;

fn main() {
    if let Err(e) = run() {
        std::process::exit(report(&e));
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("matchbuild=debug")
    } else {
        EnvFilter::new("matchbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute mode
    match Mode::from_cli(&cli)? {
        Mode::Configure => commands::configure::execute(&cli),
        Mode::Progress => commands::progress::execute(&cli),
    }
}

/// Print a fatal error and pick the exit status.
fn report(err: &anyhow::Error) -> i32 {
    let color = std::io::stderr().is_terminal();

    if let Some(e) = err.downcast_ref::<UsageError>() {
        emit(&e.to_diagnostic(), color);
        return 2;
    }

    let diagnostic = if let Some(e) = err.downcast_ref::<ValidationError>() {
        Some(e.to_diagnostic())
    } else if let Some(e) = err.downcast_ref::<ResolutionError>() {
        Some(e.to_diagnostic())
    } else if let Some(e) = err.downcast_ref::<ToolchainConfigError>() {
        Some(e.to_diagnostic())
    } else {
        err.downcast_ref::<GraphError>().map(GraphError::to_diagnostic)
    };

    match diagnostic {
        Some(diag) => emit(&diag, color),
        None => eprintln!("error: {:#}", err),
    }
    1
}
