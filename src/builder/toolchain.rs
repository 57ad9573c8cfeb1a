//! Toolchain location and command generation.
//!
//! Every external tool is located the same way: an explicit path from the
//! command line wins, then the project's pinned download location under the
//! build directory, then `PATH`. Lookups are lazy so a project that never
//! assembles anything does not need binutils.

use std::path::{Path, PathBuf};

use crate::core::errors::ToolchainConfigError;
use crate::core::flags::FlagSet;
use crate::core::manifest::Manifest;
use crate::util::fs::slash_path;
use crate::util::process::find_executable;

/// Executable suffix for the host.
pub const EXE: &str = if cfg!(windows) { ".exe" } else { "" };

/// A command to run, with program and arguments.
///
/// Arguments are shell fragments: flags such as `-proc gekko` are kept
/// whole and written into the build file as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "mwcceppc.exe", "dtk")
    pub program: PathBuf,
    /// Leading programs the command runs through (wrapper, sjiswrap)
    pub launchers: Vec<PathBuf>,
    /// Command arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            launchers: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Run the program through `launcher`.
    pub fn launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.launchers.push(launcher.into());
        self
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add a path argument, quoted if it contains whitespace.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(quote_path(path))
    }

    /// Render as a single shell command line.
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = self.launchers.iter().map(|p| quote_path(p)).collect();
        parts.push(quote_path(&self.program));
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

fn quote_path(path: &Path) -> String {
    let s = slash_path(path);
    if s.contains(char::is_whitespace) {
        format!("\"{}\"", s)
    } else {
        s
    }
}

/// External tools resolved for one manifest.
#[derive(Debug, Clone)]
pub struct Toolchain {
    compilers: Option<PathBuf>,
    binutils: Option<PathBuf>,
    dtk: Option<PathBuf>,
    objdiff: Option<PathBuf>,
    ninja: Option<PathBuf>,
    sjiswrap: Option<PathBuf>,
    wrapper: Option<PathBuf>,
    linker_version: Option<String>,
}

impl Toolchain {
    /// Locate tools for `manifest`.
    pub fn locate(manifest: &Manifest) -> Self {
        let tools = manifest.tools();
        let pinned = |tool: &str, path: PathBuf| {
            manifest
                .tool_tags()
                .contains_key(tool)
                .then(|| manifest.build_dir().join(path))
        };

        let compilers = tools
            .compilers
            .clone()
            .or_else(|| pinned("compilers", PathBuf::from("compilers")));
        let binutils = tools
            .binutils
            .clone()
            .or_else(|| pinned("binutils", PathBuf::from("binutils")))
            .or_else(|| {
                find_executable(&format!("powerpc-eabi-as{}", EXE))
                    .and_then(|p| p.parent().map(Path::to_path_buf))
            });
        let dtk = tools
            .dtk
            .clone()
            .or_else(|| pinned("dtk", PathBuf::from(format!("tools/dtk{}", EXE))))
            .or_else(|| find_executable("dtk"));
        let objdiff = tools
            .objdiff
            .clone()
            .or_else(|| pinned("objdiff", PathBuf::from(format!("tools/objdiff-cli{}", EXE))))
            .or_else(|| find_executable("objdiff-cli"));
        let ninja = tools.ninja.clone().or_else(|| find_executable("ninja"));
        let sjiswrap = tools
            .sjiswrap
            .clone()
            .or_else(|| pinned("sjiswrap", PathBuf::from("tools/sjiswrap.exe")));
        let wrapper = if cfg!(windows) {
            None
        } else {
            tools
                .wrapper
                .clone()
                .or_else(|| pinned("wibo", PathBuf::from("tools/wibo")))
        };

        Toolchain {
            compilers,
            binutils,
            dtk,
            objdiff,
            ninja,
            sjiswrap,
            wrapper,
            linker_version: manifest.linker_version().map(str::to_string),
        }
    }

    /// The same tools with no diff tool, whatever `PATH` holds.
    #[cfg(test)]
    pub(crate) fn without_differ(mut self) -> Self {
        self.objdiff = None;
        self
    }

    /// Compiler binary for a toolchain version tag.
    pub fn compiler(&self, tag: &str, feature: &str) -> Result<PathBuf, ToolchainConfigError> {
        let dir = self
            .compilers
            .as_ref()
            .ok_or_else(|| ToolchainConfigError::MissingTool {
                tool: "compilers",
                feature: feature.to_string(),
            })?;
        Ok(dir.join(tag).join("mwcceppc.exe"))
    }

    /// Linker binary for the configured linker version.
    pub fn linker(&self, feature: &str) -> Result<PathBuf, ToolchainConfigError> {
        let tag = self.linker_version.as_deref().ok_or_else(|| {
            ToolchainConfigError::MissingLinkerVersion {
                feature: feature.to_string(),
            }
        })?;
        let dir = self
            .compilers
            .as_ref()
            .ok_or_else(|| ToolchainConfigError::MissingTool {
                tool: "compilers",
                feature: feature.to_string(),
            })?;
        Ok(dir.join(tag).join("mwldeppc.exe"))
    }

    pub fn assembler(&self, feature: &str) -> Result<PathBuf, ToolchainConfigError> {
        self.binutils
            .as_ref()
            .map(|dir| dir.join(format!("powerpc-eabi-as{}", EXE)))
            .ok_or_else(|| ToolchainConfigError::MissingTool {
                tool: "binutils",
                feature: feature.to_string(),
            })
    }

    pub fn dtk(&self, feature: &str) -> Result<PathBuf, ToolchainConfigError> {
        self.dtk
            .clone()
            .ok_or_else(|| ToolchainConfigError::MissingTool {
                tool: "dtk",
                feature: feature.to_string(),
            })
    }

    /// The diff tool, used for progress reports.
    pub fn differ(&self, feature: &str) -> Result<PathBuf, ToolchainConfigError> {
        self.objdiff
            .clone()
            .ok_or_else(|| ToolchainConfigError::MissingTool {
                tool: "objdiff",
                feature: feature.to_string(),
            })
    }

    /// The build executor. Falls back to a bare `ninja` for the differ's
    /// rebuild command, since nothing here runs it.
    pub fn ninja(&self) -> PathBuf {
        self.ninja.clone().unwrap_or_else(|| PathBuf::from("ninja"))
    }

    fn windows_tool(&self, program: PathBuf, sjis: bool) -> CommandSpec {
        let mut cmd = CommandSpec::new(program);
        if sjis {
            if let Some(sjiswrap) = &self.sjiswrap {
                cmd.launchers.insert(0, sjiswrap.clone());
            }
        }
        if let Some(wrapper) = &self.wrapper {
            cmd.launchers.insert(0, wrapper.clone());
        }
        cmd
    }

    /// `mwcceppc <flags> -c <source> -o <output>`
    pub fn compile_command(
        &self,
        tag: &str,
        flags: &FlagSet,
        source: &Path,
        output: &Path,
    ) -> Result<CommandSpec, ToolchainConfigError> {
        let feature = format!("compiling `{}`", slash_path(source));
        let compiler = self.compiler(tag, &feature)?;
        Ok(self
            .windows_tool(compiler, true)
            .args(flags.iter())
            .arg("-c")
            .path_arg(source)
            .arg("-o")
            .path_arg(output))
    }

    /// `powerpc-eabi-as <flags> -o <output> <source>`
    pub fn assemble_command(
        &self,
        flags: &FlagSet,
        source: &Path,
        output: &Path,
    ) -> Result<CommandSpec, ToolchainConfigError> {
        let feature = format!("assembling `{}`", slash_path(source));
        let assembler = self.assembler(&feature)?;
        Ok(CommandSpec::new(assembler)
            .args(flags.iter())
            .arg("-o")
            .path_arg(output)
            .path_arg(source))
    }

    /// `mwldeppc <flags> -lcf <ldscript> <objects...> -o <output> [-map <map>]`
    pub fn link_command(
        &self,
        flags: &FlagSet,
        ldscript: &Path,
        objects: &[PathBuf],
        output: &Path,
        map: Option<&Path>,
    ) -> Result<CommandSpec, ToolchainConfigError> {
        let feature = match map {
            Some(_) => format!("linking `{}` with a map file", slash_path(output)),
            None => format!("linking `{}`", slash_path(output)),
        };
        let linker = self.linker(&feature)?;

        let mut cmd = self
            .windows_tool(linker, false)
            .args(flags.iter())
            .arg("-lcf")
            .path_arg(ldscript);
        for object in objects {
            cmd = cmd.path_arg(object);
        }
        cmd = cmd.arg("-o").path_arg(output);
        if let Some(map) = map {
            cmd = cmd.arg("-map").path_arg(map);
        }
        Ok(cmd)
    }

    /// `objdiff-cli report generate -o <output> [extra]`
    pub fn report_command(
        &self,
        output: &Path,
        extra: &[String],
    ) -> Result<CommandSpec, ToolchainConfigError> {
        Ok(CommandSpec::new(self.differ("progress reporting")?)
            .args(["report", "generate", "-o"])
            .path_arg(output)
            .args(extra.iter().cloned()))
    }

    /// `dtk elf2dol <elf> <dol>`
    pub fn elf2dol_command(&self, elf: &Path, dol: &Path) -> Result<CommandSpec, ToolchainConfigError> {
        let feature = format!("producing `{}`", slash_path(dol));
        Ok(CommandSpec::new(self.dtk(&feature)?)
            .arg("elf2dol")
            .path_arg(elf)
            .path_arg(dol))
    }

    /// `dtk dol split <config> <out_dir>`
    pub fn split_command(
        &self,
        config: &Path,
        out_dir: &Path,
    ) -> Result<CommandSpec, ToolchainConfigError> {
        Ok(CommandSpec::new(self.dtk("splitting the reference image")?)
            .args(["dol", "split"])
            .path_arg(config)
            .path_arg(out_dir))
    }

    /// `dtk shasum -q -c <sha1> -o <stamp>`
    pub fn check_command(
        &self,
        sha1: &Path,
        stamp: &Path,
    ) -> Result<CommandSpec, ToolchainConfigError> {
        Ok(CommandSpec::new(self.dtk("checksum verification")?)
            .args(["shasum", "-q", "-c"])
            .path_arg(sha1)
            .arg("-o")
            .path_arg(stamp))
    }
}
