//! Mode implementations

pub mod configure;
pub mod progress;

use std::path::Path;

use anyhow::Result;

use crate::cli::Cli;
use matchbuild::core::errors::UsageError;
use matchbuild::core::flags::WarnPolicy;
use matchbuild::core::manifest::{Features, ToolPaths};
use matchbuild::core::PROJECT_FILE_NAME;
use matchbuild::ops::ManifestOptions;

/// What the invocation asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Configure,
    Progress,
}

impl Mode {
    /// Validate the positional mode and the flags that only make sense in one mode.
    pub fn from_cli(cli: &Cli) -> Result<Mode, UsageError> {
        let mode = match cli.mode.as_deref() {
            None | Some("configure") => Mode::Configure,
            Some("progress") => Mode::Progress,
            Some(other) => {
                return Err(UsageError::UnknownMode {
                    mode: other.to_string(),
                })
            }
        };

        if mode == Mode::Progress && cli.features.no_progress {
            return Err(UsageError::Conflict {
                message: "`progress` cannot be combined with `--no-progress`".to_string(),
            });
        }
        if mode == Mode::Configure && cli.progress.report.is_some() {
            return Err(UsageError::Conflict {
                message: "`--report` is only accepted in `progress` mode".to_string(),
            });
        }

        Ok(mode)
    }
}

/// Manifest settings shared by both modes.
pub fn manifest_options(cli: &Cli) -> Result<ManifestOptions, UsageError> {
    let warn = cli
        .features
        .warn
        .as_deref()
        .map(|s| s.parse::<WarnPolicy>())
        .transpose()
        .map_err(|e| UsageError::Conflict {
            message: e.to_string(),
        })?;

    let tools = &cli.tools;
    Ok(ManifestOptions {
        project: cli.project.clone(),
        version: cli.game_version.clone(),
        build_dir: cli.build_dir.clone(),
        tools: ToolPaths {
            binutils: tools.binutils.clone(),
            compilers: tools.compilers.clone(),
            dtk: tools.dtk.clone(),
            objdiff: tools.objdiff.clone(),
            sjiswrap: tools.sjiswrap.clone(),
            wrapper: tools.wrapper.clone(),
            ninja: tools.ninja.clone(),
        },
        features: Features {
            debug: cli.features.debug,
            generate_map: cli.features.map,
            non_matching: cli.features.non_matching,
            warn,
            progress: !cli.features.no_progress,
            progress_each_module: cli.verbose,
        },
    })
}

/// Flags that select the same project, version, and tools when the
/// generated build re-invokes the tool from the project root.
pub fn forwarded_args(cli: &Cli) -> Vec<String> {
    let mut args = Vec::new();

    let project_name = cli
        .project
        .file_name()
        .map(Path::new)
        .unwrap_or_else(|| Path::new(PROJECT_FILE_NAME));
    if project_name != Path::new(PROJECT_FILE_NAME) {
        push_path(&mut args, "--project", project_name);
    }
    if let Some(version) = &cli.game_version {
        args.push("--version".to_string());
        args.push(version.clone());
    }
    if let Some(dir) = &cli.build_dir {
        push_path(&mut args, "--build-dir", dir);
    }

    let tools = &cli.tools;
    for (flag, path) in [
        ("--binutils", &tools.binutils),
        ("--compilers", &tools.compilers),
        ("--dtk", &tools.dtk),
        ("--objdiff", &tools.objdiff),
        ("--sjiswrap", &tools.sjiswrap),
        ("--wrapper", &tools.wrapper),
        ("--ninja", &tools.ninja),
    ] {
        if let Some(path) = path {
            push_path(&mut args, flag, path);
        }
    }

    args
}

/// Flags that change which objects link or how they are counted, so the
/// generated regeneration and progress commands see the same build.
pub fn feature_args(cli: &Cli) -> Vec<String> {
    let features = &cli.features;
    let mut args: Vec<String> = [
        ("--map", features.map),
        ("--debug", features.debug),
        ("--non-matching", features.non_matching),
        ("--verbose", cli.verbose),
    ]
    .into_iter()
    .filter(|(_, set)| *set)
    .map(|(flag, _)| flag.to_string())
    .collect();

    if let Some(warn) = &features.warn {
        args.push("--warn".to_string());
        args.push(warn.clone());
    }
    args
}

fn push_path(args: &mut Vec<String>, flag: &str, path: &Path) {
    args.push(flag.to_string());
    args.push(path.to_string_lossy().into_owned());
}
