//! `build.ninja` generation.
//!
//! Every edge carries its full command line in a `cmd` variable, so one
//! rule per target kind is enough and the file diffs cleanly between
//! configurations.

use std::path::{Path, PathBuf};

use crate::builder::graph::{BuildGraph, BuildTarget, TargetKind};
use crate::builder::toolchain::CommandSpec;
use crate::util::fs::slash_path;

/// Default build file name.
pub const BUILD_FILE_NAME: &str = "build.ninja";

/// Steps around the graph itself: regeneration and progress reporting.
#[derive(Debug, Clone, Default)]
pub struct GeneratorSteps {
    /// Rerun configuration when any of these change
    pub configure: Option<ConfigureStep>,
    /// Produce the differ report after the build
    pub report: Option<ReportStep>,
    /// Print progress after the build
    pub progress: Option<CommandSpec>,
}

#[derive(Debug, Clone)]
pub struct ConfigureStep {
    /// The build file itself
    pub build_file: PathBuf,
    /// Other files the configure step writes
    pub outputs: Vec<PathBuf>,
    pub command: CommandSpec,
    /// Project file plus reconfiguration dependencies
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ReportStep {
    pub output: PathBuf,
    pub command: CommandSpec,
    pub inputs: Vec<PathBuf>,
}

/// Renders a build graph as a ninja file.
pub struct NinjaWriter<'a> {
    graph: &'a BuildGraph,
    steps: &'a GeneratorSteps,
    header: Vec<String>,
    out: String,
}

impl<'a> NinjaWriter<'a> {
    pub fn new(graph: &'a BuildGraph, steps: &'a GeneratorSteps) -> Self {
        NinjaWriter {
            graph,
            steps,
            header: Vec::new(),
            out: String::new(),
        }
    }

    /// Add a comment line to the file header.
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.header.push(text.into());
        self
    }

    pub fn render(mut self) -> String {
        self.line("# Generated by matchbuild; do not edit.");
        for text in std::mem::take(&mut self.header) {
            self.line(&format!("# {}", text));
        }
        self.line(&format!("# fingerprint: {}", self.graph.fingerprint()));
        self.blank();
        self.line("ninja_required_version = 1.3");
        self.blank();

        self.rules();

        for target in self.graph.targets() {
            self.target(target);
        }

        if let Some(report) = &self.steps.report {
            self.edge(
                &[report.output.as_path()],
                &[],
                "report",
                &report.inputs.iter().map(PathBuf::as_path).collect::<Vec<_>>(),
                &[],
            );
            self.variable("cmd", &report.command.render());
            self.blank();
        }

        if let Some(progress) = &self.steps.progress {
            let mut inputs: Vec<&Path> = vec![self.graph.image()];
            if let Some(report) = &self.steps.report {
                inputs.push(report.output.as_path());
            }
            self.out.push_str("build progress: progress | ");
            self.out.push_str(&join_paths(&inputs));
            self.out.push('\n');
            self.variable("cmd", &progress.render());
            self.blank();
        }

        if let Some(configure) = &self.steps.configure {
            let outputs = [configure.build_file.as_path()];
            let implicit: Vec<&Path> = configure.outputs.iter().map(PathBuf::as_path).collect();
            let inputs: Vec<&Path> = configure.inputs.iter().map(PathBuf::as_path).collect();
            self.edge(&outputs, &implicit, "configure", &[], &inputs);
            self.variable("cmd", &configure.command.render());
            self.blank();
        }

        let default = escape_path(self.graph.default_target());
        self.line(&format!("default {}", default));
        self.out
    }

    fn rules(&mut self) {
        for kind in [
            TargetKind::Split,
            TargetKind::Compile,
            TargetKind::Assemble,
            TargetKind::Link,
            TargetKind::PostProcess,
        ] {
            self.rule(kind.rule_name(), false, false);
        }
        if self.graph.targets_of(TargetKind::Check).next().is_some() {
            self.rule(TargetKind::Check.rule_name(), false, false);
        }
        if self.steps.report.is_some() {
            self.rule("report", false, false);
        }
        if self.steps.progress.is_some() {
            self.rule("progress", false, true);
        }
        if self.steps.configure.is_some() {
            self.rule("configure", true, false);
        }
    }

    fn rule(&mut self, name: &str, generator: bool, console: bool) {
        self.line(&format!("rule {}", name));
        self.variable("command", "$cmd");
        self.variable("description", "$desc");
        if generator {
            self.variable("generator", "1");
        }
        if console {
            self.variable("pool", "console");
        }
        self.blank();
    }

    fn target(&mut self, target: &BuildTarget) {
        let outputs = [target.output.as_path()];
        let implicit_outputs: Vec<&Path> =
            target.implicit_outputs.iter().map(PathBuf::as_path).collect();
        let inputs: Vec<&Path> = target.inputs.iter().map(PathBuf::as_path).collect();
        let implicit_inputs: Vec<&Path> =
            target.implicit_inputs.iter().map(PathBuf::as_path).collect();

        self.edge(
            &outputs,
            &implicit_outputs,
            target.kind.rule_name(),
            &inputs,
            &implicit_inputs,
        );
        self.variable("cmd", &target.command.render());
        self.variable("desc", &target.description);
        self.blank();
    }

    fn edge(
        &mut self,
        outputs: &[&Path],
        implicit_outputs: &[&Path],
        rule: &str,
        inputs: &[&Path],
        implicit_inputs: &[&Path],
    ) {
        let mut line = format!("build {}", join_paths(outputs));
        if !implicit_outputs.is_empty() {
            line.push_str(" | ");
            line.push_str(&join_paths(implicit_outputs));
        }
        line.push_str(": ");
        line.push_str(rule);
        if !inputs.is_empty() {
            line.push(' ');
            line.push_str(&join_paths(inputs));
        }
        if !implicit_inputs.is_empty() {
            line.push_str(" | ");
            line.push_str(&join_paths(implicit_inputs));
        }
        self.line(&line);
    }

    fn variable(&mut self, key: &str, value: &str) {
        self.line(&format!("  {} = {}", key, escape_value(value)));
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}

fn join_paths(paths: &[&Path]) -> String {
    paths
        .iter()
        .map(|p| escape_path(p))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape a path for use in a build line.
pub fn escape_path(path: &Path) -> String {
    slash_path(path)
        .replace('$', "$$")
        .replace(' ', "$ ")
        .replace(':', "$:")
}

/// Escape a variable value. `$cmd`-style references are left alone.
fn escape_value(value: &str) -> String {
    if value.starts_with('$') && value[1..].chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return value.to_string();
    }
    value.replace('$', "$$")
}
