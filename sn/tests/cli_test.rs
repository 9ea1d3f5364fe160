//! End-to-end tests for the `sn` binary
//!
//! Every test runs in its own temp directory with HOME and the XDG dirs
//! pointed inside it, so logs and storage never touch the real user dirs.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new(client_yaml: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = format!(
            "storage:\n  dir: {}\nclient:\n{}",
            dir.path().join("data").display(),
            client_yaml
        );
        fs::write(dir.path().join("sn.yml"), config).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config_path(&self) -> PathBuf {
        self.path().join("sn.yml")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn sn(&self) -> Command {
        let mut cmd = Command::cargo_bin("sn").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_DATA_HOME", self.path().join("xdg-data"))
            .env("XDG_CONFIG_HOME", self.path().join("xdg-config"))
            .env("NO_COLOR", "1")
            .env_remove("SEATSNIPER_COOKIE")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config_path());
        cmd
    }
}

const TARGETS: &str = r#"[
    {"kch_id": "C1", "kcmc": "Calculus", "jxb_id": "J1", "jxbmc": "Calculus-01"},
    {"kch_id": "C2", "kcmc": "Physics", "jxb_id": "J2"},
    {"kch_id": "", "kcmc": "Broken", "jxb_id": "J3"},
    {"kch_id": "C4", "kcmc": "No section"}
]"#;

const UNREACHABLE_CLIENT: &str = "  base-url: http://127.0.0.1:9\n  student-id: \"20231234\"\n";

#[test]
fn test_add_then_list_targets() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let file = sandbox.write("targets.json", TARGETS);

    sandbox
        .sn()
        .arg("add")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped 2 target(s)"))
        .stdout(predicate::str::contains("Saved 2 target(s)"));

    sandbox
        .sn()
        .arg("targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Calculus"))
        .stdout(predicate::str::contains("Calculus-01"));

    sandbox
        .sn()
        .args(["targets", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"resource_id\": \"C2\""));

    assert!(sandbox.path().join("data").join("target_courses.json").exists());
}

#[test]
fn test_add_append_merges() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let first = sandbox.write("first.json", TARGETS);
    let second = sandbox.write(
        "second.yml",
        "- resource_id: C3\n  name: Chemistry\n  section_id: J3\n",
    );

    sandbox.sn().arg("add").arg(&first).assert().success();
    sandbox
        .sn()
        .args(["add", "--append"])
        .arg(&second)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 3 target(s)"));
}

#[test]
fn test_add_rejects_unreadable_file() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let file = sandbox.write("targets.txt", "not a target list");

    sandbox.sn().arg("add").arg(&file).assert().failure();
}

#[test]
fn test_status_empty() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);

    sandbox
        .sn()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No status recorded yet."));
}

#[test]
fn test_run_without_targets_fails() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);

    sandbox
        .sn()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No targets saved"));
}

#[test]
fn test_run_without_cookie_fails_before_start() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let file = sandbox.write("targets.json", TARGETS);
    sandbox.sn().arg("add").arg(&file).assert().success();

    sandbox
        .sn()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SEATSNIPER_COOKIE"));

    assert!(!sandbox.path().join("data").join("course_status.json").exists());
}

#[test]
fn test_run_against_unreachable_server_exhausts() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let file = sandbox.write("targets.json", TARGETS);
    sandbox.sn().arg("add").arg(&file).assert().success();

    sandbox
        .sn()
        .env("SEATSNIPER_COOKIE", "JSESSIONID=test")
        .args([
            "run",
            "--countdown",
            "0",
            "--max-attempts",
            "1",
            "--interval-min",
            "0",
            "--interval-max",
            "0",
        ])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success()
        .stdout(predicate::str::contains("Result:     exhausted"))
        .stdout(predicate::str::contains("Attempts:   2"));

    sandbox
        .sn()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Calculus (C1): failed - transient:"));

    sandbox
        .sn()
        .args(["status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"failed\""));
}

#[test]
fn test_run_counts_down_before_start() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let file = sandbox.write("targets.json", TARGETS);
    sandbox.sn().arg("add").arg(&file).assert().success();

    sandbox
        .sn()
        .env("SEATSNIPER_COOKIE", "JSESSIONID=test")
        .args(["run", "--countdown", "1", "--max-attempts", "1", "--interval-max", "0", "--interval-min", "0"])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting in 1..."))
        .stdout(predicate::str::contains("Starting now!"));
}

#[test]
fn test_clear_removes_everything() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let file = sandbox.write("targets.json", TARGETS);
    sandbox.sn().arg("add").arg(&file).assert().success();

    sandbox.sn().arg("clear").assert().success();

    sandbox
        .sn()
        .arg("targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("No targets saved"));
}

#[test]
fn test_unknown_scheduler_key_is_rejected() {
    let sandbox = Sandbox::new(UNREACHABLE_CLIENT);
    let config = sandbox.write("bad.yml", "scheduler:\n  max-attempt: 3\n");

    let mut cmd = Command::cargo_bin("sn").unwrap();
    cmd.current_dir(sandbox.path())
        .env("HOME", sandbox.path())
        .env("XDG_DATA_HOME", sandbox.path().join("xdg-data"))
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
