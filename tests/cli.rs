// ABOUTME: Integration tests for the bedrock-keeper CLI commands.
// ABOUTME: Validates --help output, init, status, and offline error reporting.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn keeper_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bedrock-keeper"))
}

#[test]
fn help_shows_commands() {
    keeper_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("check-update"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("keeper.yml");

    keeper_cmd()
        .arg("--dir")
        .arg(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    assert!(config_path.exists(), "keeper.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("backup:"));
    assert!(content.contains("max_size_gb"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("keeper.yml"), "backup: {}").unwrap();

    keeper_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn status_reports_missing_install_as_json() {
    let temp_dir = tempfile::tempdir().unwrap();

    let output = keeper_cmd()
        .args(["--json", "status", "--dir"])
        .arg(temp_dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["state"], "stopped");
    assert_eq!(status["installed"], false);
    assert!(status["online"].as_array().unwrap().is_empty());
}

#[test]
fn status_prints_human_summary() {
    let temp_dir = tempfile::tempdir().unwrap();

    keeper_cmd()
        .arg("--dir")
        .arg(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:       stopped"))
        .stdout(predicate::str::contains("version:     not installed"))
        .stdout(predicate::str::contains("last manual: never"));
}

#[test]
fn backup_without_world_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    keeper_cmd()
        .arg("--dir")
        .arg(temp_dir.path())
        .arg("backup")
        .assert()
        .failure()
        .stderr(predicate::str::contains("world directory not found"));
}

#[test]
fn backup_archives_world_into_manual_folder() {
    let temp_dir = tempfile::tempdir().unwrap();
    let world = temp_dir.path().join("server_files/worlds/Bedrock level");
    fs::create_dir_all(&world).unwrap();
    fs::write(world.join("level.dat"), b"level").unwrap();

    keeper_cmd()
        .arg("--dir")
        .arg(temp_dir.path())
        .args(["--quiet", "backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup written to"));

    let archives: Vec<_> = fs::read_dir(temp_dir.path().join("backup/worlds_manual"))
        .unwrap()
        .collect();
    assert_eq!(archives.len(), 1);
}

#[test]
fn run_without_install_fails_with_hint() {
    let temp_dir = tempfile::tempdir().unwrap();

    keeper_cmd()
        .arg("--dir")
        .arg(temp_dir.path())
        .arg("run")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("server binary not found"));
}
