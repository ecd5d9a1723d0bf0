//! Integration tests for the nuro binary

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A home directory whose registry lists one local source.
fn create_home() -> TempDir {
    let temp_dir = tempfile::Builder::new()
        .prefix("nuro_test_")
        .tempdir()
        .expect("Failed to create temp directory");
    let cmds = temp_dir.path().join("cmds");
    fs::create_dir_all(&cmds).unwrap();
    fs::create_dir_all(temp_dir.path().join("home/config")).unwrap();
    let registry = serde_json::json!({
        "buckets": [
            {"name": "dev", "uri": format!("local::{}", cmds.display()), "priority": 5}
        ]
    });
    fs::write(
        temp_dir.path().join("home/config/buckets.json"),
        registry.to_string(),
    )
    .unwrap();
    temp_dir
}

fn nuro(root: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("nuro").unwrap();
    cmd.env("NURO_HOME", root.join("home"))
        .env_remove("NURO_DEBUG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_version() {
    let temp = create_home();
    nuro(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("nuro {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_banner_without_command() {
    let temp = create_home();
    nuro(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("USAGE:"))
        .stdout(predicate::str::contains("(no commands listed / offline)"));
}

#[test]
fn test_banner_for_slash_question() {
    let temp = create_home();
    nuro(temp.path())
        .arg("/?")
        .assert()
        .success()
        .stdout(predicate::str::contains("GLOBAL OPTIONS:"));
}

#[test]
fn test_missing_command_exits_one() {
    let temp = create_home();
    nuro(temp.path())
        .arg("missing")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "command 'missing' not found in any source",
        ));
}

#[test]
fn test_missing_command_json_envelope() {
    let temp = create_home();
    let output = nuro(temp.path())
        .args(["--json", "missing"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["error"]["code"], "command");
}

#[test]
fn test_unknown_global_option_exits_two() {
    let temp = create_home();
    nuro(temp.path()).arg("--bogus").assert().code(2);
}

#[test]
fn test_list_with_empty_cache() {
    let temp = create_home();
    nuro(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout("(no cached commands)\n");
}

#[cfg(unix)]
#[test]
fn test_shell_command_output_and_exit_code() {
    let temp = create_home();
    fs::write(
        temp.path().join("cmds/greet.sh"),
        "echo \"hello $1\"\nexit 4\n",
    )
    .unwrap();

    nuro(temp.path())
        .args(["greet", "world"])
        .assert()
        .code(4)
        .stdout("hello world\n");
}

#[cfg(unix)]
#[test]
fn test_arguments_after_command_pass_through() {
    let temp = create_home();
    fs::write(temp.path().join("cmds/args.sh"), "echo \"$@\"\n").unwrap();

    nuro(temp.path())
        .args(["dev:args", "-h", "--debug"])
        .assert()
        .success()
        .stdout("-h --debug\n");
}

#[cfg(unix)]
#[test]
fn test_cached_command_listed_after_first_run() {
    let temp = create_home();
    fs::write(temp.path().join("cmds/greet.sh"), "echo hi\n").unwrap();

    nuro(temp.path()).arg("greet").assert().success();
    assert!(temp.path().join("home/sh/dev/greet.sh").is_file());

    nuro(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("greet  dev/sh"));

    nuro(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("COMMANDS (known):\n  greet\n"));
}

#[test]
fn test_debug_flag_writes_log_file() {
    let temp = create_home();
    nuro(temp.path()).args(["--debug", "missing"]).assert().code(1);

    let log = fs::read_to_string(temp.path().join("home/logs/nuro-debug.log")).unwrap();
    assert!(log.contains("missing"));
}
