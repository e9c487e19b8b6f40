use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn prints_version() {
    let exe = env!("CARGO_BIN_EXE_slashdot-tui");
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .expect("run slashdot-tui --version");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "stdout was: {}",
        stdout.trim()
    );
}

#[test]
fn prints_help() {
    let exe = env!("CARGO_BIN_EXE_slashdot-tui");
    let output = Command::new(exe)
        .arg("--help")
        .output()
        .expect("run slashdot-tui --help");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(stdout.starts_with("slashdot-tui - Browse"), "stdout was: {}", stdout.trim());
    assert!(stdout.contains("--database"));
}

#[test]
fn lists_headlines_in_file_order() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("headlines.json");
    fs::write(
        &db,
        r#"[
  ["k1", ["Big News", "http://example.com/a", "", "", "", 0, "", "", 1000000000, null]],
  ["k2", ["Small News", "http://example.com/b", "", "", "", 0, "", "", [15258, 51712, 0], null]]
]"#,
    )
    .unwrap();

    let output = Command::cargo_bin("slashdot-tui")
        .unwrap()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("--database")
        .arg(&db)
        .arg("--list")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" - Big News"), "stdout was: {stdout}");
    assert!(lines[1].ends_with(" - Small News"), "stdout was: {stdout}");
}

#[test]
fn missing_database_warns_without_failing() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("absent.json");

    Command::cargo_bin("slashdot-tui")
        .unwrap()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("--database")
        .arg(&db)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No such file"));
}

#[test]
fn malformed_database_fails() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("broken.json");
    fs::write(&db, "not json").unwrap();

    Command::cargo_bin("slashdot-tui")
        .unwrap()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("--database")
        .arg(&db)
        .arg("--list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse headline database"));
}

#[test]
fn unknown_flag_is_rejected() {
    Command::cargo_bin("slashdot-tui")
        .unwrap()
        .arg("--frobnicate")
        .assert()
        .code(2);
}
