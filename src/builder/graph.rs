//! Build graph compilation.
//!
//! Turns a manifest into a flat, ordered list of [`BuildTarget`]s: the
//! toolkit split that produces linker scripts and reference objects, one per
//! built object, one link per module, a post-process step, and an optional
//! checksum stamp. The result is fully deterministic for a given manifest,
//! and is checked for cycles and undeclared generated inputs before it is
//! returned.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::builder::link_order::{Identity, LinkOrderStrategy};
use crate::builder::rules::{module_dir, ResolvedObject, Rule, RuleResolver};
use crate::builder::toolchain::{CommandSpec, Toolchain};
use crate::core::errors::{GraphError, ResolutionError};
use crate::core::manifest::Manifest;
use crate::core::module::ModuleId;
use crate::util::fs::slash_path;
use crate::util::hash::Fingerprint;

/// Module list written by the split step, inside the version directory.
pub const SPLIT_CONFIG_FILE_NAME: &str = "config.json";

/// Stamp written once the final image passes its checksum.
pub const CHECK_STAMP_FILE_NAME: &str = "ok";

/// What a target does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetKind {
    Split,
    Compile,
    Assemble,
    Link,
    PostProcess,
    Check,
}

impl TargetKind {
    /// Name of the build-file rule that runs this kind of target.
    pub fn rule_name(self) -> &'static str {
        match self {
            TargetKind::Split => "split",
            TargetKind::Compile => "mwcc",
            TargetKind::Assemble => "as",
            TargetKind::Link => "link",
            TargetKind::PostProcess => "postprocess",
            TargetKind::Check => "check",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_name())
    }
}

/// A single step in the build graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub kind: TargetKind,
    pub output: PathBuf,
    /// Side outputs, such as a linker map
    pub implicit_outputs: Vec<PathBuf>,
    /// Ordered inputs; for links this is the link order
    pub inputs: Vec<PathBuf>,
    /// Inputs that trigger a rebuild but are not passed on the command line
    pub implicit_inputs: Vec<PathBuf>,
    pub command: CommandSpec,
    pub description: String,
}

impl BuildTarget {
    fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.output).chain(self.implicit_outputs.iter())
    }
}

/// The compiled build graph.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    targets: Vec<BuildTarget>,
    objects: Vec<ResolvedObject>,
    link_orders: BTreeMap<ModuleId, Vec<String>>,
    image: PathBuf,
    default_target: PathBuf,
}

impl BuildGraph {
    /// Targets in emission order.
    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    /// Every resolved object, built or not, in declaration order.
    pub fn objects(&self) -> &[ResolvedObject] {
        &self.objects
    }

    /// The post-processed image.
    pub fn image(&self) -> &Path {
        &self.image
    }

    /// What a bare `ninja` builds: the checksum stamp when one is
    /// configured, otherwise the image.
    pub fn default_target(&self) -> &Path {
        &self.default_target
    }

    pub fn target(&self, output: &Path) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.output == output)
    }

    pub fn targets_of(&self, kind: TargetKind) -> impl Iterator<Item = &BuildTarget> {
        self.targets.iter().filter(move |t| t.kind == kind)
    }

    /// Link order applied to `module`, by object name.
    pub fn link_order(&self, module: ModuleId) -> Option<&[String]> {
        self.link_orders.get(&module).map(Vec::as_slice)
    }

    /// Stable digest of every target's kind, paths, and command.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        for target in &self.targets {
            fp.update_str(target.kind.rule_name());
            fp.update_str(&slash_path(&target.output));
            fp.update_strs(target.implicit_outputs.iter().map(|p| slash_path(p)));
            fp.update_strs(target.inputs.iter().map(|p| slash_path(p)));
            fp.update_strs(target.implicit_inputs.iter().map(|p| slash_path(p)));
            fp.update_str(&target.command.render());
        }
        fp.finish()
    }
}

/// Compiles a manifest into a [`BuildGraph`].
pub struct GraphCompiler<'a> {
    manifest: &'a Manifest,
    strategy: &'a dyn LinkOrderStrategy,
    toolchain: Toolchain,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        GraphCompiler {
            manifest,
            strategy: &Identity,
            toolchain: Toolchain::locate(manifest),
        }
    }

    /// Use `strategy` to rewrite each module's link order.
    pub fn with_strategy(mut self, strategy: &'a dyn LinkOrderStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Compile the graph.
    ///
    /// Link orders for every module are resolved and checked before any
    /// target is emitted.
    pub fn compile(&self) -> Result<BuildGraph, GraphError> {
        let manifest = self.manifest;
        let objects = RuleResolver::new(manifest).resolve_all()?;

        let mut link_orders = BTreeMap::new();
        let mut link_inputs = BTreeMap::new();
        for module in manifest.modules() {
            let (names, indices) = self.resolve_link_order(module.id, &objects)?;
            link_orders.insert(module.id, names);
            link_inputs.insert(module.id, indices);
        }

        let mut targets = vec![self.split_target(&objects)?];

        for module in manifest.modules() {
            for object in objects.iter().filter(|o| o.module == module.id && o.builds) {
                if let Some(target) = self.object_target(object)? {
                    targets.push(target);
                }
            }
        }

        let mut images = Vec::new();
        for module in manifest.modules() {
            let inputs: Vec<PathBuf> = link_inputs
                .get(&module.id)
                .map(|indices: &Vec<usize>| {
                    indices.iter().map(|&i| objects[i].output.clone()).collect()
                })
                .unwrap_or_default();
            let target = self.link_target(module.id, &module.name, inputs)?;
            images.push(target.output.clone());
            targets.push(target);
        }

        let post = self.post_process_target(images)?;
        let image = post.output.clone();
        targets.push(post);

        let default_target = match manifest.check_sha() {
            Some(sha1) => {
                let check = self.check_target(sha1, &image)?;
                let stamp = check.output.clone();
                targets.push(check);
                stamp
            }
            None => image.clone(),
        };

        validate(manifest.build_dir(), &targets)?;

        info!(
            targets = targets.len(),
            objects = objects.len(),
            "compiled build graph"
        );

        Ok(BuildGraph {
            targets,
            objects,
            link_orders,
            image,
            default_target,
        })
    }

    fn resolve_link_order(
        &self,
        module: ModuleId,
        objects: &[ResolvedObject],
    ) -> Result<(Vec<String>, Vec<usize>), ResolutionError> {
        let mut by_name: BTreeMap<&str, usize> = BTreeMap::new();
        for (index, object) in objects.iter().enumerate().filter(|(_, o)| o.module == module) {
            if by_name.insert(object.name.as_str(), index).is_some() {
                return Err(ResolutionError::DuplicateOutput {
                    output: object.output.clone(),
                });
            }
        }

        let default: Vec<String> = objects
            .iter()
            .filter(|o| o.module == module && o.links)
            .map(|o| o.name.clone())
            .collect();

        let order = self.strategy.reorder(module, default);

        let mut seen = BTreeSet::new();
        let mut indices = Vec::with_capacity(order.len());
        for name in &order {
            let index = *by_name.get(name.as_str()).ok_or_else(|| {
                ResolutionError::LinkOrderUnknownObject {
                    module,
                    object: name.clone(),
                }
            })?;
            if !objects[index].links {
                return Err(ResolutionError::LinkOrderIneligibleObject {
                    module,
                    object: name.clone(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(ResolutionError::LinkOrderDuplicate {
                    module,
                    object: name.clone(),
                });
            }
            indices.push(index);
        }

        debug!(%module, objects = indices.len(), "resolved link order");
        Ok((order, indices))
    }

    /// `dtk dol split`, which writes every module's linker script and the
    /// reference objects the differ compares against.
    fn split_target(&self, objects: &[ResolvedObject]) -> Result<BuildTarget, GraphError> {
        let manifest = self.manifest;
        let dir = manifest.version_dir();
        let config = manifest.config_path();

        let mut implicit_outputs: Vec<PathBuf> = manifest
            .modules()
            .iter()
            .map(|m| module_dir(manifest, m.id).join("ldscript.lcf"))
            .collect();
        implicit_outputs.extend(objects.iter().map(|o| o.reference.clone()));

        let command = self.toolchain.split_command(&config, &dir)?;

        Ok(BuildTarget {
            kind: TargetKind::Split,
            description: format!("SPLIT {}", slash_path(&config)),
            output: dir.join(SPLIT_CONFIG_FILE_NAME),
            implicit_outputs,
            inputs: vec![config],
            implicit_inputs: Vec::new(),
            command,
        })
    }

    fn object_target(&self, object: &ResolvedObject) -> Result<Option<BuildTarget>, GraphError> {
        let build_dir = self.manifest.build_dir();
        let implicit_inputs: Vec<PathBuf> = object
            .flags
            .include_dirs()
            .into_iter()
            .filter(|dir| !dir.starts_with(build_dir))
            .collect();

        let (kind, command, verb) = match object.rule {
            Rule::Compile => (
                TargetKind::Compile,
                self.toolchain.compile_command(
                    &object.toolchain,
                    &object.flags,
                    &object.source,
                    &object.output,
                )?,
                "MWCC",
            ),
            Rule::Assemble => (
                TargetKind::Assemble,
                self.toolchain
                    .assemble_command(&object.flags, &object.source, &object.output)?,
                "AS",
            ),
            Rule::Prebuilt => return Ok(None),
        };

        Ok(Some(BuildTarget {
            kind,
            output: object.output.clone(),
            implicit_outputs: Vec::new(),
            inputs: vec![object.source.clone()],
            implicit_inputs,
            command,
            description: format!("{} {}", verb, slash_path(&object.source)),
        }))
    }

    fn link_target(
        &self,
        module: ModuleId,
        name: &str,
        inputs: Vec<PathBuf>,
    ) -> Result<BuildTarget, GraphError> {
        let manifest = self.manifest;
        let dir = module_dir(manifest, module);

        let (output, ldscript, flags) = if module.is_main() {
            (
                dir.join("main.elf"),
                manifest.ldscript(),
                manifest.ldflags().clone(),
            )
        } else {
            let mut flags = manifest.ldflags().clone();
            flags.push("-r1");
            flags.push("-strip_partial");
            flags.push("-m _prolog");
            (
                dir.join(format!("{}.plf", name)),
                dir.join("ldscript.lcf"),
                flags,
            )
        };
        let map = manifest.features().generate_map.then(|| {
            let mut map = output.clone().into_os_string();
            map.push(".MAP");
            PathBuf::from(map)
        });

        let command =
            self.toolchain
                .link_command(&flags, &ldscript, &inputs, &output, map.as_deref())?;

        Ok(BuildTarget {
            kind: TargetKind::Link,
            description: format!("LINK {}", slash_path(&output)),
            output,
            implicit_outputs: map.into_iter().collect(),
            inputs,
            implicit_inputs: vec![ldscript],
            command,
        })
    }

    fn post_process_target(&self, images: Vec<PathBuf>) -> Result<BuildTarget, GraphError> {
        let dir = self.manifest.version_dir();
        let elf = dir.join("main.elf");
        let dol = dir.join("main.dol");
        let command = self.toolchain.elf2dol_command(&elf, &dol)?;

        Ok(BuildTarget {
            kind: TargetKind::PostProcess,
            description: format!("ELF2DOL {}", slash_path(&dol)),
            output: dol,
            implicit_outputs: Vec::new(),
            inputs: images,
            implicit_inputs: Vec::new(),
            command,
        })
    }

    fn check_target(&self, sha1: &Path, image: &Path) -> Result<BuildTarget, GraphError> {
        let stamp = self.manifest.version_dir().join(CHECK_STAMP_FILE_NAME);
        let command = self.toolchain.check_command(sha1, &stamp)?;

        Ok(BuildTarget {
            kind: TargetKind::Check,
            description: format!("CHECK {}", slash_path(sha1)),
            output: stamp,
            implicit_outputs: Vec::new(),
            inputs: vec![sha1.to_path_buf()],
            implicit_inputs: vec![image.to_path_buf()],
            command,
        })
    }
}

/// Check outputs are unique, generated inputs are declared, and the graph
/// is acyclic.
fn validate(build_dir: &Path, targets: &[BuildTarget]) -> Result<(), ResolutionError> {
    let mut producers: BTreeMap<&Path, usize> = BTreeMap::new();
    for (index, target) in targets.iter().enumerate() {
        for output in target.outputs() {
            if producers.insert(output.as_path(), index).is_some() {
                return Err(ResolutionError::DuplicateOutput {
                    output: output.clone(),
                });
            }
        }
    }

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..targets.len()).map(|i| graph.add_node(i)).collect();

    for (index, target) in targets.iter().enumerate() {
        for input in target.inputs.iter().chain(target.implicit_inputs.iter()) {
            match producers.get(input.as_path()) {
                Some(&producer) => {
                    graph.add_edge(nodes[producer], nodes[index], ());
                }
                None if input.starts_with(build_dir) => {
                    return Err(ResolutionError::UndeclaredInput {
                        target: target.output.clone(),
                        input: input.clone(),
                    });
                }
                None => {}
            }
        }
    }

    toposort(&graph, None).map_err(|cycle| ResolutionError::Cycle {
        output: targets[graph[cycle.node_id()]].output.clone(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::link_order::{AppendInNonMatching, ExplicitOrder};
    use crate::core::errors::ToolchainConfigError;
    use crate::core::library::{LibraryBuilder, ObjectSpec};
    use crate::core::status::MatchStatus;
    use crate::test_support::fixtures;

    fn compile(manifest: &Manifest) -> BuildGraph {
        GraphCompiler::new(manifest).compile().unwrap()
    }

    fn object_outputs(graph: &BuildGraph) -> Vec<String> {
        graph
            .targets()
            .iter()
            .filter(|t| matches!(t.kind, TargetKind::Compile | TargetKind::Assemble))
            .map(|t| slash_path(&t.output))
            .collect()
    }

    #[test]
    fn test_sdk_game_scenario_graph() {
        let manifest = fixtures::sdk_game_manifest(false);
        let graph = compile(&manifest);

        assert_eq!(object_outputs(&graph).len(), 4);
        assert!(!object_outputs(&graph).iter().any(|o| o.contains("actor")));

        let links: Vec<_> = graph.targets_of(TargetKind::Link).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].inputs.len(), 4);
        assert_eq!(links[0].output, PathBuf::from("build/GAMEE/main.elf"));

        assert_eq!(graph.default_target(), Path::new("build/GAMEE/main.dol"));
        assert_eq!(graph.image(), Path::new("build/GAMEE/main.dol"));
        let post = graph.targets().last().unwrap();
        assert_eq!(post.kind, TargetKind::PostProcess);
        assert_eq!(post.inputs, vec![PathBuf::from("build/GAMEE/main.elf")]);
    }

    #[test]
    fn test_non_matching_never_linked() {
        for non_matching in [false, true] {
            let manifest = fixtures::sdk_game_manifest(non_matching);
            let graph = compile(&manifest);
            let unlinked: BTreeSet<PathBuf> = graph
                .objects()
                .iter()
                .filter(|o| !o.links)
                .map(|o| o.output.clone())
                .collect();
            for link in graph.targets_of(TargetKind::Link) {
                assert!(link.inputs.iter().all(|i| !unlinked.contains(i)));
            }
        }
    }

    #[test]
    fn test_non_matching_mode_compiles_unlinked_objects() {
        let manifest = fixtures::sdk_game_manifest(true);
        let graph = compile(&manifest);
        assert_eq!(object_outputs(&graph).len(), 5);
        let link = graph.targets_of(TargetKind::Link).next().unwrap();
        assert_eq!(link.inputs.len(), 4);
    }

    #[test]
    fn test_equivalent_linked_only_in_non_matching_mode() {
        for non_matching in [false, true] {
            let manifest = fixtures::equivalent_manifest(non_matching);
            let graph = compile(&manifest);
            let link = graph.targets_of(TargetKind::Link).next().unwrap();
            let linked = link
                .inputs
                .contains(&PathBuf::from("build/GAMEE/src/game/actor.o"));
            assert_eq!(linked, non_matching);
        }
    }

    #[test]
    fn test_regeneration_is_identical() {
        let manifest = fixtures::sdk_game_manifest(false);
        let first = compile(&manifest);
        let second = compile(&manifest);
        assert_eq!(first.targets(), second.targets());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_reorder_override_is_applied_exactly() {
        let manifest = fixtures::sdk_game_manifest(false);
        let reverse = |_: ModuleId, mut objects: Vec<String>| {
            objects.reverse();
            objects
        };
        let graph = GraphCompiler::new(&manifest)
            .with_strategy(&reverse)
            .compile()
            .unwrap();

        let link = graph.targets_of(TargetKind::Link).next().unwrap();
        let expected: Vec<PathBuf> = [
            "build/GAMEE/src/game/main.o",
            "build/GAMEE/src/os/OSAlloc.o",
            "build/GAMEE/src/os/OSCache.o",
            "build/GAMEE/src/os/OSInit.o",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(link.inputs, expected);
        assert_eq!(
            graph.link_order(ModuleId::MAIN).unwrap(),
            &["game/main.c", "os/OSAlloc.c", "os/OSCache.c", "os/OSInit.c"]
        );
    }

    #[test]
    fn test_override_with_unknown_object_is_fatal() {
        let manifest = fixtures::sdk_game_manifest(false);
        let strategy = AppendInNonMatching::new(ModuleId::MAIN, ["dummy.c"], true);
        let err = GraphCompiler::new(&manifest)
            .with_strategy(&strategy)
            .compile()
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Resolution(ResolutionError::LinkOrderUnknownObject { ref object, .. })
                if object == "dummy.c"
        ));
    }

    #[test]
    fn test_override_with_non_matching_object_is_fatal() {
        let manifest = fixtures::sdk_game_manifest(false);
        let strategy = ExplicitOrder::new().with_order(ModuleId::MAIN, ["os/OSInit.c", "game/actor.c"]);
        let err = GraphCompiler::new(&manifest)
            .with_strategy(&strategy)
            .compile()
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Resolution(ResolutionError::LinkOrderIneligibleObject { .. })
        ));
    }

    #[test]
    fn test_override_with_duplicate_is_fatal() {
        let manifest = fixtures::sdk_game_manifest(false);
        let strategy = ExplicitOrder::new().with_order(ModuleId::MAIN, ["os/OSInit.c", "os/OSInit.c"]);
        let err = GraphCompiler::new(&manifest)
            .with_strategy(&strategy)
            .compile()
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Resolution(ResolutionError::LinkOrderDuplicate { .. })
        ));
    }

    #[test]
    fn test_manifest_link_order_applied() {
        let manifest = fixtures::sdk_game_builder(false)
            .link_order(ModuleId::MAIN, ["game/main.c", "os/OSInit.c"])
            .build()
            .unwrap();
        let strategy = crate::builder::link_order::from_manifest(&manifest);
        let graph = GraphCompiler::new(&manifest)
            .with_strategy(&strategy)
            .compile()
            .unwrap();
        let link = graph.targets_of(TargetKind::Link).next().unwrap();
        assert_eq!(
            link.inputs,
            vec![
                PathBuf::from("build/GAMEE/src/game/main.o"),
                PathBuf::from("build/GAMEE/src/os/OSInit.o"),
            ]
        );
    }

    #[test]
    fn test_overlay_module_linked_separately() {
        let manifest = fixtures::overlay_manifest();
        let graph = compile(&manifest);
        let links: Vec<_> = graph.targets_of(TargetKind::Link).collect();
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].output, PathBuf::from("build/GAMEE/stage/stage.plf"));
        assert!(links[1].command.args.iter().any(|a| a == "-r1"));
        assert!(!links[0].command.args.iter().any(|a| a == "-r1"));

        let post = graph.targets().last().unwrap();
        assert_eq!(
            post.inputs,
            vec![
                PathBuf::from("build/GAMEE/main.elf"),
                PathBuf::from("build/GAMEE/stage/stage.plf"),
            ]
        );
    }

    #[test]
    fn test_map_output_declared() {
        let manifest = fixtures::sdk_game_builder(false)
            .features(crate::core::manifest::Features {
                generate_map: true,
                ..Default::default()
            })
            .build()
            .unwrap();
        let graph = compile(&manifest);
        let link = graph.targets_of(TargetKind::Link).next().unwrap();
        assert_eq!(
            link.implicit_outputs,
            vec![PathBuf::from("build/GAMEE/main.elf.MAP")]
        );
        assert!(link.command.args.iter().any(|a| a == "-map"));
        assert!(link.command.args.iter().any(|a| a == "-mapunused"));
    }

    #[test]
    fn test_missing_linker_version_is_fatal() {
        let manifest = fixtures::no_linker_builder().build().unwrap();
        let err = GraphCompiler::new(&manifest).compile().unwrap_err();
        assert!(matches!(
            err,
            GraphError::Toolchain(ToolchainConfigError::MissingLinkerVersion { .. })
        ));
    }

    #[test]
    fn test_same_path_in_two_libraries_rejected() {
        let manifest = fixtures::sdk_game_builder(false)
            .library(
                LibraryBuilder::new("Copy")
                    .category("sdk")
                    .object(ObjectSpec::new(MatchStatus::Matching, "os/OSInit.c")),
            )
            .build()
            .unwrap();
        let err = GraphCompiler::new(&manifest).compile().unwrap_err();
        assert!(matches!(
            err,
            GraphError::Resolution(ResolutionError::DuplicateOutput { .. })
        ));
    }

    fn produced(graph: &BuildGraph) -> BTreeSet<&Path> {
        graph
            .targets()
            .iter()
            .flat_map(|t| t.outputs())
            .map(PathBuf::as_path)
            .collect()
    }

    #[test]
    fn test_generated_inputs_all_have_producers() {
        for manifest in [
            fixtures::sdk_game_manifest(false),
            fixtures::sdk_game_manifest(true),
            fixtures::overlay_manifest(),
        ] {
            let graph = compile(&manifest);
            let produced = produced(&graph);
            for target in graph.targets() {
                for input in target.inputs.iter().chain(&target.implicit_inputs) {
                    if input.starts_with(manifest.build_dir()) {
                        assert!(
                            produced.contains(input.as_path()),
                            "{} has no producer",
                            input.display()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_split_produces_ldscripts_and_references() {
        let manifest = fixtures::overlay_manifest();
        let graph = compile(&manifest);
        let split = graph.targets_of(TargetKind::Split).next().unwrap();

        assert_eq!(split.output, PathBuf::from("build/GAMEE/config.json"));
        assert_eq!(split.inputs, vec![PathBuf::from("config/GAMEE/config.yml")]);
        assert!(split
            .implicit_outputs
            .contains(&PathBuf::from("build/GAMEE/ldscript.lcf")));
        assert!(split
            .implicit_outputs
            .contains(&PathBuf::from("build/GAMEE/stage/ldscript.lcf")));
        for object in graph.objects() {
            assert!(split.implicit_outputs.contains(&object.reference));
        }
        assert_eq!(graph.targets()[0].kind, TargetKind::Split);
    }

    #[test]
    fn test_checksum_stamp_is_default() {
        let manifest = fixtures::sdk_game_builder(false)
            .check_sha("config/GAMEE/build.sha1")
            .build()
            .unwrap();
        let graph = compile(&manifest);

        let check = graph.targets().last().unwrap();
        assert_eq!(check.kind, TargetKind::Check);
        assert_eq!(check.inputs, vec![PathBuf::from("config/GAMEE/build.sha1")]);
        assert_eq!(check.implicit_inputs, vec![PathBuf::from("build/GAMEE/main.dol")]);
        assert_eq!(graph.default_target(), Path::new("build/GAMEE/ok"));
        assert_eq!(graph.image(), Path::new("build/GAMEE/main.dol"));
    }

    #[test]
    fn test_no_checksum_without_sha_file() {
        let graph = compile(&fixtures::sdk_game_manifest(false));
        assert_eq!(graph.targets_of(TargetKind::Check).count(), 0);
    }

    fn target(output: &str, inputs: &[&str]) -> BuildTarget {
        BuildTarget {
            kind: TargetKind::Link,
            output: PathBuf::from(output),
            implicit_outputs: Vec::new(),
            inputs: inputs.iter().map(PathBuf::from).collect(),
            implicit_inputs: Vec::new(),
            command: CommandSpec::new("true"),
            description: String::new(),
        }
    }

    #[test]
    fn test_validate_detects_cycle() {
        let targets = vec![
            target("build/a.o", &["build/b.o"]),
            target("build/b.o", &["build/a.o"]),
        ];
        let err = validate(Path::new("build"), &targets).unwrap_err();
        assert!(matches!(err, ResolutionError::Cycle { .. }));
    }

    #[test]
    fn test_validate_detects_undeclared_input() {
        let targets = vec![target("build/main.elf", &["build/a.o", "src/b.o"])];
        let err = validate(Path::new("build"), &targets).unwrap_err();
        match err {
            ResolutionError::UndeclaredInput { input, .. } => {
                assert_eq!(input, PathBuf::from("build/a.o"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_detects_undeclared_implicit_input() {
        let mut link = target("build/main.elf", &["src/a.o"]);
        link.implicit_inputs.push(PathBuf::from("build/ldscript.lcf"));
        let err = validate(Path::new("build"), &[link]).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::UndeclaredInput { ref input, .. } if input == Path::new("build/ldscript.lcf")
        ));
    }
}
