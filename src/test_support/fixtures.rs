//! Test fixtures for common test scenarios.
//!
//! The reference scenario is a two-library project: "Sdk" (category `sdk`,
//! three matching objects) and "Game" (category `game`, one matching and
//! one non-matching object), all linked into the main image.

use std::path::PathBuf;

use crate::core::library::{LibraryBuilder, ObjectSpec};
use crate::core::manifest::{Features, Manifest, ManifestBuilder, ProgressCategory, ToolPaths};
use crate::core::module::{ModuleDecl, ModuleId};
use crate::core::status::MatchStatus;
use crate::core::version::VersionSet;

/// Tool paths pointing at the usual download locations.
pub fn tool_paths() -> ToolPaths {
    ToolPaths {
        binutils: Some(PathBuf::from("build/binutils")),
        compilers: Some(PathBuf::from("build/compilers")),
        dtk: Some(PathBuf::from("build/tools/dtk")),
        objdiff: Some(PathBuf::from("build/tools/objdiff-cli")),
        ..Default::default()
    }
}

fn base_builder(non_matching: bool) -> ManifestBuilder {
    let versions = VersionSet::new(["GAMEE", "GAMEJ"]).unwrap();
    let version = versions.default_version();
    ManifestBuilder::new(versions, version)
        .cflags(["-nodefaults", "-proc gekko", "-O4,p"])
        .ldflags(["-fp hardware", "-nodefaults"])
        .linker_version("GC/1.3.2")
        .tools(tool_paths())
        .features(Features {
            non_matching,
            ..Features::default()
        })
        .category(ProgressCategory::new("game", "Game Code"))
        .category(ProgressCategory::new("sdk", "SDK Code"))
}

fn sdk_library() -> LibraryBuilder {
    LibraryBuilder::new("Sdk")
        .toolchain("GC/1.2.5n")
        .category("sdk")
        .object(ObjectSpec::new(MatchStatus::Matching, "os/OSInit.c"))
        .object(ObjectSpec::new(MatchStatus::Matching, "os/OSCache.c"))
        .object(ObjectSpec::new(MatchStatus::Matching, "os/OSAlloc.c"))
}

fn game_library(actor: MatchStatus) -> LibraryBuilder {
    LibraryBuilder::new("Game")
        .toolchain("GC/1.3.2")
        .category("game")
        .object(ObjectSpec::new(MatchStatus::Matching, "game/main.c"))
        .object(ObjectSpec::new(actor, "game/actor.c"))
}

/// Builder for the reference scenario, open for further changes.
pub fn sdk_game_builder(non_matching: bool) -> ManifestBuilder {
    base_builder(non_matching)
        .library(sdk_library())
        .library(game_library(MatchStatus::NonMatching))
}

/// The reference scenario.
pub fn sdk_game_manifest(non_matching: bool) -> Manifest {
    sdk_game_builder(non_matching).build().unwrap()
}

/// The reference scenario with `game/actor.c` marked equivalent.
pub fn equivalent_manifest(non_matching: bool) -> Manifest {
    base_builder(non_matching)
        .library(sdk_library())
        .library(game_library(MatchStatus::Equivalent))
        .build()
        .unwrap()
}

/// The reference scenario plus a `stage` overlay module.
pub fn overlay_manifest() -> Manifest {
    sdk_game_builder(false)
        .module(ModuleDecl::new(ModuleId(1), "stage"))
        .library(
            LibraryBuilder::new("Stage")
                .toolchain("GC/1.3.2")
                .category("game")
                .module(ModuleId(1))
                .cflags(["-sdata 0", "-sdata2 0"])
                .object(ObjectSpec::new(MatchStatus::Matching, "stage/init.c"))
                .object(ObjectSpec::new(MatchStatus::NonMatching, "stage/boss.c")),
        )
        .build()
        .unwrap()
}

/// A project without `linker_version`.
pub fn no_linker_builder() -> ManifestBuilder {
    let versions = VersionSet::new(["GAMEE"]).unwrap();
    let version = versions.default_version();
    ManifestBuilder::new(versions, version)
        .tools(tool_paths())
        .category(ProgressCategory::new("game", "Game Code"))
        .library(
            LibraryBuilder::new("Game")
                .toolchain("GC/1.3.2")
                .category("game")
                .object(ObjectSpec::new(MatchStatus::Matching, "main.c")),
        )
}

/// A project file equivalent to [`sdk_game_manifest`].
pub const SDK_GAME_PROJECT: &str = r#"
versions = ["GAMEE", "GAMEJ"]
linker_version = "GC/1.3.2"

[flags]
cflags = ["-nodefaults", "-proc gekko", "-O4,p"]
ldflags = ["-fp hardware", "-nodefaults"]

[[categories]]
key = "game"
label = "Game Code"

[[categories]]
key = "sdk"
label = "SDK Code"

[[libraries]]
name = "Sdk"
toolchain = "GC/1.2.5n"
category = "sdk"
objects = [
    { path = "os/OSInit.c", status = "matching" },
    { path = "os/OSCache.c", status = "matching" },
    { path = "os/OSAlloc.c", status = "matching" },
]

[[libraries]]
name = "Game"
toolchain = "GC/1.3.2"
category = "game"
objects = [
    { path = "game/main.c", status = "matching" },
    { path = "game/actor.c", status = "non_matching" },
]
"#;
