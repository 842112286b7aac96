//! End-to-end integration tests for the scanengine CLI binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn create_test_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::create_dir(root.join("src")).unwrap();
    fs::create_dir(root.join(".git")).unwrap();
    fs::write(root.join(".git/config"), "ignored").unwrap();

    fs::write(root.join("README.md"), "# Test Project\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("src/lib.rs"), "pub fn add(a: i32, b: i32) -> i32 { a + b }\n").unwrap();

    temp_dir
}

#[test]
fn scan_reports_file_count_and_excludes_git() {
    let temp_dir = create_test_tree();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("scan")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files:      3"));
}

#[test]
fn scan_respects_max_depth() {
    let temp_dir = create_test_tree();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("scan")
        .arg(temp_dir.path())
        .arg("--max-depth=0")
        .assert()
        .success()
        .stdout(predicate::str::contains("files:      1"));
}

#[test]
fn scan_json_output_is_well_formed() {
    let temp_dir = create_test_tree();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("--output=json")
        .arg("scan")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"root\""))
        .stdout(predicate::str::contains("\"file_count\""));
}

#[test]
fn duplicates_detects_exact_content_match() {
    let temp_dir = create_test_tree();
    fs::write(temp_dir.path().join("a.txt"), "identical content").unwrap();
    fs::write(temp_dir.path().join("b.txt"), "identical content").unwrap();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("duplicates")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("exact_"));
}

#[test]
fn duplicates_no_exact_false_positive_for_distinct_files() {
    let temp_dir = create_test_tree();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("duplicates")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0 exact groups"));
}

#[test]
fn snapshot_create_then_diff_detects_rename() {
    let temp_dir = create_test_tree();

    let work = TempDir::new().unwrap();
    let snap_a = work.path().join("a.json");
    let snap_b = work.path().join("b.json");

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("snapshot")
        .arg("create")
        .arg(temp_dir.path())
        .arg("--out")
        .arg(&snap_a)
        .assert()
        .success();

    fs::rename(
        temp_dir.path().join("README.md"),
        temp_dir.path().join("README_renamed.md"),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("snapshot")
        .arg("create")
        .arg(temp_dir.path())
        .arg("--out")
        .arg(&snap_b)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("snapshot")
        .arg("diff")
        .arg(&snap_a)
        .arg(&snap_b)
        .assert()
        .success()
        .stdout(predicate::str::contains("README.md"))
        .stdout(predicate::str::contains("README_renamed.md"));
}

#[test]
fn scan_size_filters_exclude_small_files() {
    let temp_dir = create_test_tree();
    fs::write(temp_dir.path().join("tiny.txt"), "x").unwrap();

    let mut cmd = Command::cargo_bin("scanengine").unwrap();
    cmd.arg("scan")
        .arg(temp_dir.path())
        .arg("--min-size=10")
        .assert()
        .success()
        .stdout(predicate::str::contains("files:      3"));
}
