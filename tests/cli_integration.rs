//! CLI integration tests for matchbuild.
//!
//! These tests drive both modes through the binary against a scratch project.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const PROJECT: &str = r#"
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

const REPORT: &str = r#"{
    "units": [
        { "name": "main/os/OSInit", "measures": { "total_code": "100", "matched_code": "100" } },
        { "name": "main/os/OSCache", "measures": { "total_code": "100", "matched_code": "100" } },
        { "name": "main/os/OSAlloc", "measures": { "total_code": "100", "matched_code": "100" } },
        { "name": "main/game/main", "measures": { "total_code": "100", "matched_code": "100" } },
        { "name": "main/game/actor", "measures": { "total_code": "100", "matched_code": "40" } }
    ]
}"#;

/// Get the matchbuild binary command.
fn matchbuild() -> Command {
    Command::cargo_bin("matchbuild").unwrap()
}

/// Create a scratch directory holding `project.toml`.
fn project_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("project.toml"), PROJECT).unwrap();
    tmp
}

/// Tool flags pointing at the pinned layout; nothing is executed.
fn tool_args() -> [&'static str; 6] {
    [
        "--compilers",
        "build/compilers",
        "--dtk",
        "build/tools/dtk",
        "--objdiff",
        "build/tools/objdiff-cli",
    ]
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

// ============================================================================
// matchbuild configure
// ============================================================================

#[test]
fn test_configure_writes_build_files() {
    let tmp = project_dir();

    matchbuild()
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("build.ninja"));

    let ninja = read(&tmp.path().join("build.ninja"));
    assert!(ninja.contains("rule mwcc"));
    assert!(ninja.contains("build/GAMEE/src/os/OSInit.o"));
    assert!(ninja.contains("default build/GAMEE/main.dol"));
    assert!(ninja.contains("rule progress"));
    assert!(ninja.contains(" configure --compilers build/compilers"));

    let metadata = read(&tmp.path().join("objdiff.json"));
    assert!(metadata.contains("\"main/game/actor\""));
}

#[test]
fn test_progress_command_keeps_feature_flags() {
    let tmp = project_dir();

    matchbuild()
        .args(["configure", "--non-matching", "--verbose", "--warn", "off"])
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .success();

    let ninja = read(&tmp.path().join("build.ninja"));
    let progress = ninja
        .lines()
        .find(|l| l.starts_with("  cmd = ") && l.contains(" progress "))
        .unwrap();
    assert!(progress.contains(" --non-matching "));
    assert!(progress.contains(" --verbose "));
    assert!(progress.contains(" --warn off "));
    assert!(progress.ends_with(" --report build/GAMEE/report.json"));

    let regenerate = ninja
        .lines()
        .find(|l| l.starts_with("  cmd = ") && l.contains(" configure "))
        .unwrap();
    assert!(regenerate.contains(" --non-matching "));
}

#[test]
fn test_configure_checksum_becomes_default() {
    let tmp = TempDir::new().unwrap();
    let project = PROJECT.replacen(
        "linker_version",
        "check_sha = \"config/{version}/build.sha1\"\nlinker_version",
        1,
    );
    fs::write(tmp.path().join("project.toml"), project).unwrap();

    matchbuild()
        .args(["--no-progress"])
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .success();

    let ninja = read(&tmp.path().join("build.ninja"));
    assert!(ninja.contains("build build/GAMEE/ok: check config/GAMEE/build.sha1 | build/GAMEE/main.dol"));
    assert!(ninja.contains("shasum -q -c config/GAMEE/build.sha1 -o build/GAMEE/ok"));
    assert!(ninja.trim_end().ends_with("default build/GAMEE/ok"));
}

#[test]
fn test_configure_selects_version() {
    let tmp = project_dir();

    matchbuild()
        .args(["configure", "-v", "GAMEJ", "--no-progress"])
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .success();

    let ninja = read(&tmp.path().join("build.ninja"));
    assert!(ninja.contains("-DVERSION_GAMEJ"));
    assert!(ninja.contains("default build/GAMEJ/main.dol"));
    assert!(!ninja.contains("rule progress"));
}

#[test]
fn test_configure_rerun_is_fresh() {
    let tmp = project_dir();

    matchbuild()
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .success();

    matchbuild()
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Fresh"));
}

#[test]
fn test_configure_without_compilers_fails() {
    let tmp = project_dir();

    matchbuild()
        .args(["--no-progress", "--dtk", "build/tools/dtk"])
        .current_dir(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("requires `compilers`"));

    assert!(!tmp.path().join("build.ninja").exists());
}

#[test]
fn test_unknown_version_is_usage_error() {
    let tmp = project_dir();

    matchbuild()
        .args(["--version", "GAMEP"])
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown version `GAMEP`"))
        .stderr(predicate::str::contains("GAMEE, GAMEJ"));
}

#[test]
fn test_unknown_mode_is_usage_error() {
    let tmp = project_dir();

    matchbuild()
        .arg("bulid")
        .current_dir(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown mode `bulid`"));
}

#[test]
fn test_missing_project_fails() {
    let tmp = TempDir::new().unwrap();

    matchbuild()
        .current_dir(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("project file not found"));
}

#[test]
fn test_invalid_project_names_field() {
    let tmp = TempDir::new().unwrap();
    let broken = PROJECT.replace("category = \"sdk\"", "category = \"sdkk\"");
    fs::write(tmp.path().join("project.toml"), broken).unwrap();

    matchbuild()
        .args(tool_args())
        .current_dir(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown progress category `sdkk`"))
        .stderr(predicate::str::contains("libraries[Sdk].category"));
}

// ============================================================================
// matchbuild progress
// ============================================================================

#[test]
fn test_progress_from_report() {
    let tmp = project_dir();
    fs::write(tmp.path().join("report.json"), REPORT).unwrap();

    matchbuild()
        .args(["progress", "--report", "report.json"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("88.00%"))
        .stdout(predicate::str::contains("Game Code"))
        .stdout(predicate::str::contains("SDK Code"));

    assert!(tmp.path().join("build/GAMEE/progress.jsonl").exists());
}

#[test]
fn test_progress_json() {
    let tmp = project_dir();
    fs::write(tmp.path().join("report.json"), REPORT).unwrap();

    let output = matchbuild()
        .args(["progress", "--report", "report.json", "--json"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["version"], "GAMEE");
    assert_eq!(value["overall"]["matched_units"], 440);
    assert_eq!(value["overall"]["total_units"], 500);
    assert_eq!(value["categories"].as_array().unwrap().len(), 2);
}

#[test]
fn test_progress_conflicts_with_no_progress() {
    let tmp = project_dir();

    matchbuild()
        .args(["progress", "--no-progress"])
        .current_dir(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--no-progress"));
}

#[test]
fn test_report_only_in_progress_mode() {
    let tmp = project_dir();

    matchbuild()
        .args(["configure", "--report", "report.json"])
        .current_dir(tmp.path())
        .assert()
        .code(2);
}
