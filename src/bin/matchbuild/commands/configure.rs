//! `matchbuild configure` mode

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::commands::{feature_args, forwarded_args, manifest_options};
use matchbuild::ops::{configure, ConfigureOptions};

pub fn execute(cli: &Cli) -> Result<()> {
    let program = std::env::current_exe().context("failed to locate the matchbuild executable")?;

    let mut regenerate_args = vec!["configure".to_string()];
    regenerate_args.extend(forwarded_args(cli));
    regenerate_args.extend(feature_args(cli));
    if cli.features.no_progress {
        regenerate_args.push("--no-progress".to_string());
    }

    let mut progress_args = vec!["progress".to_string()];
    progress_args.extend(forwarded_args(cli));
    progress_args.extend(feature_args(cli));

    let opts = ConfigureOptions {
        manifest: manifest_options(cli)?,
        program,
        regenerate_args,
        progress_args,
    };

    let result = configure(&opts)?;

    if result.changed {
        eprintln!(
            "     Wrote {} ({} targets)",
            result.build_file.display(),
            result.targets
        );
    } else {
        eprintln!("     Fresh {}", result.build_file.display());
    }

    Ok(())
}
