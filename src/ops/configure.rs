//! Implementation of `matchbuild configure`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::builder::graph::{BuildGraph, GraphCompiler, SPLIT_CONFIG_FILE_NAME};
use crate::builder::link_order;
use crate::builder::metadata::{ProjectMetadata, METADATA_FILE_NAME};
use crate::builder::ninja::{ConfigureStep, GeneratorSteps, NinjaWriter, ReportStep, BUILD_FILE_NAME};
use crate::builder::toolchain::{CommandSpec, Toolchain};
use crate::core::manifest::Manifest;
use crate::ops::manifest::{load_manifest, ManifestOptions};
use crate::util::fs::write_if_changed;

/// Name of the differ report inside the version directory.
pub const REPORT_FILE_NAME: &str = "report.json";

/// Options for the configure command.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    pub manifest: ManifestOptions,

    /// Program that re-runs configuration from the build file
    pub program: PathBuf,

    /// Arguments for the regeneration command
    pub regenerate_args: Vec<String>,

    /// Arguments for the post-build progress command; `--report` is appended
    pub progress_args: Vec<String>,
}

/// What configure wrote.
#[derive(Debug, Clone)]
pub struct ConfigureResult {
    pub build_file: PathBuf,
    pub metadata_file: PathBuf,
    pub targets: usize,
    pub fingerprint: String,
    /// Whether the build file changed on disk
    pub changed: bool,
}

/// Generate `build.ninja` and `objdiff.json` for the selected version.
pub fn configure(opts: &ConfigureOptions) -> Result<ConfigureResult> {
    let manifest = load_manifest(&opts.manifest)?;
    let root = opts.manifest.root();

    let toolchain = Toolchain::locate(&manifest);
    let strategy = link_order::from_manifest(&manifest);
    let graph = GraphCompiler::new(&manifest)
        .with_strategy(&strategy)
        .with_toolchain(toolchain.clone())
        .compile()?;

    let steps = generator_steps(opts, &manifest, &graph, &toolchain)?;
    let ninja = NinjaWriter::new(&graph, &steps)
        .comment(format!("version: {}", manifest.version().id()))
        .render();

    let build_file = root.join(BUILD_FILE_NAME);
    let changed = write_if_changed(&build_file, &ninja)?;

    let metadata = ProjectMetadata::from_graph(&manifest, &graph, &toolchain.ninja());
    let metadata_file = root.join(METADATA_FILE_NAME);
    let json = metadata
        .to_json()
        .context("failed to serialize differ metadata")?;
    write_if_changed(&metadata_file, &json)?;

    let fingerprint = graph.fingerprint();
    info!(
        targets = graph.targets().len(),
        changed,
        "wrote {}",
        build_file.display()
    );

    Ok(ConfigureResult {
        build_file,
        metadata_file,
        targets: graph.targets().len(),
        fingerprint,
        changed,
    })
}

/// Regeneration, report, and progress steps around the graph.
fn generator_steps(
    opts: &ConfigureOptions,
    manifest: &Manifest,
    graph: &BuildGraph,
    toolchain: &Toolchain,
) -> Result<GeneratorSteps> {
    let mut inputs = vec![opts.manifest.project_name()];
    inputs.extend(manifest.reconfig_deps().iter().cloned());

    let configure = ConfigureStep {
        build_file: PathBuf::from(BUILD_FILE_NAME),
        outputs: vec![PathBuf::from(METADATA_FILE_NAME)],
        command: CommandSpec::new(&opts.program).args(opts.regenerate_args.iter().cloned()),
        inputs,
    };

    if !manifest.features().progress {
        return Ok(GeneratorSteps {
            configure: Some(configure),
            ..Default::default()
        });
    }

    let output = manifest.version_dir().join(REPORT_FILE_NAME);
    let mut report_inputs = vec![
        PathBuf::from(METADATA_FILE_NAME),
        manifest.version_dir().join(SPLIT_CONFIG_FILE_NAME),
    ];
    report_inputs.extend(
        graph
            .objects()
            .iter()
            .filter(|o| o.builds)
            .map(|o| o.output.clone()),
    );
    let report = ReportStep {
        command: toolchain.report_command(&output, manifest.report_args())?,
        output: output.clone(),
        inputs: report_inputs,
    };

    let progress = CommandSpec::new(&opts.program)
        .args(opts.progress_args.iter().cloned())
        .arg("--report")
        .path_arg(&output);

    Ok(GeneratorSteps {
        configure: Some(configure),
        report: Some(report),
        progress: Some(progress),
    })
}
