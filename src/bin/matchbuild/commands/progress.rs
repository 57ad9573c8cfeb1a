//! `matchbuild progress` mode

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::commands::manifest_options;
use matchbuild::ops::{progress, ProgressOptions};

pub fn execute(cli: &Cli) -> Result<()> {
    let opts = ProgressOptions {
        manifest: manifest_options(cli)?,
        report: cli.progress.report.clone(),
        jobs: cli.progress.jobs.max(1),
        timeout: Duration::from_secs(cli.progress.timeout),
        show_bar: !cli.verbose && std::io::stderr().is_terminal(),
        ..Default::default()
    };

    let run = progress(&opts)?;

    if cli.progress.json {
        let json = run
            .report
            .to_json()
            .context("failed to serialize progress report")?;
        println!("{}", json);
    } else {
        print!("{}", run.report.render_text());
    }

    Ok(())
}
