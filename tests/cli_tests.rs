//! Integration tests for the hookwarden CLI

use assert_cmd::Command;
use git2::Repository;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PROJECT: &str = r#"
[DEFAULT]
logfile = "${hooks}/hookwarden.log"

[profiles.default.precommit]
default = "delayonerror"
checks = ["RejectTabs.python", "Log..warning"]
success = ["Console"]
error = ["Console", "File.log"]

[checks.RejectTabs.python]
check_files = ['\.py$']

[handlers.File.log]
file = "${logfile}"
protocol.exclude = ["Log"]
"#;

/// A repository with a project file and `files` staged for commit.
fn repository(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    fs::create_dir_all(dir.path().join("hooks")).unwrap();
    fs::write(dir.path().join("hooks/hookwarden.toml"), PROJECT).unwrap();

    let mut index = repo.index().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, contents).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    dir
}

fn hookwarden(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hookwarden").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .env_remove("HOOKWARDEN_SETTINGS");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("hookwarden").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile-based commit hooks"));
}

#[test]
fn test_invalid_subcommand() {
    let mut cmd = Command::cargo_bin("hookwarden").unwrap();
    cmd.arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_list_modules() {
    let dir = TempDir::new().unwrap();
    hookwarden(dir.path())
        .args(["list", "--fields"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RejectTabs"))
        .stdout(predicate::str::contains("AsciiEncoded"))
        .stdout(predicate::str::contains("Console"))
        .stdout(predicate::str::contains("check_files: array"));
}

#[test]
fn test_validate_accepts_project() {
    let dir = repository(&[]);
    hookwarden(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.toml");
    fs::write(
        &config,
        r#"
[profiles.default.precommit]
checks = ["PyLint"]
success = ["Console.missing"]
"#,
    )
    .unwrap();

    hookwarden(dir.path())
        .args(["validate", "--format", "json", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains("No error found for profile 'default'"))
        .stdout(predicate::str::contains("The check 'PyLint' is not available"))
        .stdout(predicate::str::contains(
            "Configuration 'missing' for handler 'Console' is not defined",
        ));
}

#[test]
fn test_show_resolved_config() {
    let dir = repository(&[]);
    let hooks = dir.path().join("hooks").canonicalize().unwrap();
    hookwarden(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"profiles\""))
        .stdout(predicate::str::contains(format!(
            "\"file\": \"{}/hookwarden.log\"",
            hooks.display()
        )));
}

#[test]
fn test_run_precommit_passes() {
    let dir = repository(&[("src/app.py", "def main():\n    return 1\n")]);
    hookwarden(dir.path())
        .args(["run", "precommit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A\tsrc/app.py"));
    assert!(!dir.path().join("hooks/hookwarden.log").exists());
}

#[test]
fn test_run_precommit_rejects_tabs() {
    let dir = repository(&[
        ("src/app.py", "def main():\n\treturn 1\n"),
        ("Makefile", "all:\n\tmake\n"),
    ]);
    hookwarden(dir.path())
        .args(["run", "precommit"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File src/app.py contains leading tabs"))
        .stderr(predicate::str::contains("Makefile contains").not());

    let log = fs::read_to_string(dir.path().join("hooks/hookwarden.log")).unwrap();
    assert!(log.contains("RejectTabs check ran"));
    assert!(!log.contains("Log check ran"));
    // The log handler's summary only sees the entries its filter admits.
    assert!(log.contains("Profile 'default' ran 1 checks with 1 errors."));
}

#[test]
fn test_run_unknown_profile_fails() {
    let dir = repository(&[("src/app.py", "x = 1\n")]);
    hookwarden(dir.path())
        .args(["run", "precommit", "--profile", "nope"])
        .assert()
        .code(1);
}

#[test]
fn test_run_rejects_unknown_hook() {
    let dir = repository(&[]);
    hookwarden(dir.path())
        .args(["run", "precommmit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown hook"));
}
