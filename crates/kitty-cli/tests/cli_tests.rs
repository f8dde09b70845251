//! Integration tests for kitty-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Scratch layout: `input/`, `out/` and an isolated staging directory.
struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        fs::create_dir(temp.path().join("input")).unwrap();
        fs::create_dir(temp.path().join("out")).unwrap();
        fs::create_dir(temp.path().join("staging")).unwrap();
        Self { temp }
    }

    fn input(&self) -> std::path::PathBuf {
        self.temp.path().join("input")
    }

    fn out(&self) -> std::path::PathBuf {
        self.temp.path().join("out")
    }

    fn staging(&self) -> std::path::PathBuf {
        self.temp.path().join("staging")
    }

    fn write(&self, relative: &str, content: &[u8]) -> std::path::PathBuf {
        let path = self.input().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn kitty(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("kitty");
        cmd.env("KITTY_STAGING_DIR", self.staging())
            .env_remove("KITTY_LOG")
            .env("KITTY_PREFS", self.temp.path().join("prefs.json"));
        cmd
    }

    fn staging_is_empty(&self) -> bool {
        fs::read_dir(self.staging()).unwrap().next().is_none()
    }
}

fn read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("kitty")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kitty"));
}

#[test]
fn test_help_lists_subcommands() {
    cargo_bin_cmd!("kitty")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compress"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("theme"));
}

#[test]
fn test_compress_single_file() {
    let ws = Workspace::new();
    let file = ws.write("report.txt", b"quarterly numbers");

    ws.kitty()
        .arg("compress")
        .arg(&file)
        .arg("--output")
        .arg(ws.out())
        .assert()
        .success()
        .stdout(predicate::str::contains("Archive saved: report.kitty"));

    assert!(ws.out().join("report.kitty").is_file());
    assert!(ws.staging_is_empty());
}

#[test]
fn test_round_trip_tree_and_files() {
    let ws = Workspace::new();
    ws.write("photos/2024/cat.jpg", b"meow");
    ws.write("photos/dog.jpg", b"woof");
    let notes = ws.write("notes.md", b"# todo");

    ws.kitty()
        .arg("compress")
        .arg(&notes)
        .arg("--tree")
        .arg(ws.input().join("photos"))
        .arg("-o")
        .arg(ws.out())
        .assert()
        .success();

    let archive = ws.out().join("notes.kitty");
    assert!(archive.is_file());

    ws.kitty()
        .arg("extract")
        .arg(&archive)
        .arg(ws.out())
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted to chosen folder."));

    let root = ws.out().join("notes");
    assert_eq!(read(&root.join("notes.md")), b"# todo");
    assert_eq!(read(&root.join("photos/2024/cat.jpg")), b"meow");
    assert_eq!(read(&root.join("photos/dog.jpg")), b"woof");
    assert!(ws.staging_is_empty());
}

#[test]
fn test_custom_name_and_renamed_extraction_folder() {
    let ws = Workspace::new();
    ws.write("docs/readme.txt", b"hello");

    ws.kitty()
        .args(["compress", "--name", "backup"])
        .arg("--tree")
        .arg(ws.input().join("docs"))
        .arg("-o")
        .arg(ws.out())
        .assert()
        .success()
        .stdout(predicate::str::contains("Archive saved: backup.kitty"));

    let renamed = ws.out().join("monday.kitty");
    fs::rename(ws.out().join("backup.kitty"), &renamed).unwrap();

    ws.kitty()
        .arg("extract")
        .arg(&renamed)
        .arg(ws.out())
        .assert()
        .success();

    assert_eq!(read(&ws.out().join("monday/readme.txt")), b"hello");
}

#[test]
fn test_extract_twice_overwrites() {
    let ws = Workspace::new();
    let file = ws.write("data.csv", b"a,b\n1,2\n");

    ws.kitty()
        .arg("compress")
        .arg(&file)
        .arg("-o")
        .arg(ws.out())
        .assert()
        .success();

    for _ in 0..2 {
        ws.kitty()
            .arg("extract")
            .arg(ws.out().join("data.kitty"))
            .arg(ws.out())
            .assert()
            .success();
    }

    let entries: Vec<_> = fs::read_dir(ws.out().join("data")).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(read(&ws.out().join("data/data.csv")), b"a,b\n1,2\n");
}

#[test]
fn test_compress_without_input_fails() {
    let ws = Workspace::new();

    ws.kitty()
        .arg("compress")
        .arg("-o")
        .arg(ws.out())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No input selected."));

    assert!(ws.staging_is_empty());
}

#[test]
fn test_compress_folder_as_file_is_rejected() {
    let ws = Workspace::new();
    ws.write("docs/readme.txt", b"hello");

    ws.kitty()
        .arg("compress")
        .arg(ws.input().join("docs"))
        .arg("-o")
        .arg(ws.out())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tree"));
}

#[test]
fn test_extract_garbage_fails_cleanly() {
    let ws = Workspace::new();
    let junk = ws.write("junk.kitty", b"definitely not zstd");

    ws.kitty()
        .arg("extract")
        .arg(&junk)
        .arg(ws.out())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to extract"));

    assert!(!ws.out().join("junk").exists());
    assert!(ws.staging_is_empty());
}

#[test]
fn test_extract_missing_archive_fails() {
    let ws = Workspace::new();

    ws.kitty()
        .arg("extract")
        .arg(ws.input().join("nope.kitty"))
        .arg(ws.out())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot access"));
}

#[test]
fn test_json_output() {
    let ws = Workspace::new();
    let file = ws.write("a.txt", b"aaaa");

    let output = ws
        .kitty()
        .arg("--json")
        .arg("compress")
        .arg(&file)
        .arg("-o")
        .arg(ws.out())
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "compress");
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Archive saved: a.kitty");
    assert_eq!(json["data"]["compression"]["files_staged"], 1);
    assert_eq!(json["data"]["saved"]["target_name"], "a.kitty");
}

#[test]
fn test_json_error_output() {
    let ws = Workspace::new();

    let output = ws
        .kitty()
        .args(["--json", "compress", "-o"])
        .arg(ws.out())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["error"].as_str().unwrap().contains("No input selected."));
}

#[test]
fn test_theme_toggle_persists() {
    let ws = Workspace::new();

    ws.kitty()
        .args(["theme", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Light Mode"));

    ws.kitty()
        .args(["theme", "toggle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched to Dark mode"));

    ws.kitty()
        .arg("theme")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dark Mode"));
}

#[test]
fn test_quiet_suppresses_output() {
    let ws = Workspace::new();
    let file = ws.write("q.txt", b"q");

    ws.kitty()
        .arg("--quiet")
        .arg("compress")
        .arg(&file)
        .arg("-o")
        .arg(ws.out())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(ws.out().join("q.kitty").is_file());
}

#[test]
fn test_completion_bash() {
    cargo_bin_cmd!("kitty")
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kitty"));
}
