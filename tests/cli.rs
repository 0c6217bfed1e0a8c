//! End-to-end runs of the `tinysh` binary in batch mode.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write `lines` to a script in a fresh directory and return both.
fn script(lines: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.sh");
    fs::write(&path, lines).unwrap();
    (dir, path)
}

fn tinysh(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tinysh").unwrap();
    cmd.current_dir(dir).env("PATH", "/bin:/usr/bin");
    cmd
}

#[test]
fn local_variable_expands() {
    let (dir, path) = script("local x=/tmp\necho $x\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .success()
        .stdout("/tmp\n");
}

#[test]
fn exit_status_is_the_last_command() {
    let (dir, path) = script("true\nfalse\n");
    tinysh(dir.path()).arg(&path).assert().code(1);

    let (dir, path) = script("false\nexit 7\necho unreachable\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .code(7)
        .stdout("");
}

#[test]
fn unknown_command() {
    let (dir, path) = script("nonexistentcmd\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .code(127)
        .stderr(predicate::str::contains("command not found: nonexistentcmd"));
}

#[test]
fn redirection_to_file() {
    let (dir, path) = script("echo hi > out.txt\necho there >> out.txt\necho visible\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .success()
        .stdout("visible\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "hi\nthere\n"
    );
}

#[test]
fn history_after_resize() {
    let (dir, path) = script("history set 2\necho a\necho b\necho c\nhistory\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .success()
        .stdout("a\nb\nc\n1) echo b\n2) echo c\n");
}

#[test]
fn history_size_flag() {
    let (dir, path) = script("echo a\necho b\nhistory\n");
    tinysh(dir.path())
        .args(["--history-size", "1"])
        .arg(&path)
        .assert()
        .success()
        .stdout("a\nb\n1) echo b\n");

    tinysh(dir.path())
        .args(["--history-size", "500"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--history-size"));
}

#[test]
fn invalid_path_is_fatal() {
    let (dir, path) = script("export PATH=/no/such/dir\npwd\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .code(255)
        .stderr(predicate::str::contains("invalid PATH value"))
        .stderr(predicate::str::contains("WARN").not());
}

#[test]
fn syntax_error_keeps_going() {
    let (dir, path) = script("echo a >\necho b\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .success()
        .stdout("b\n")
        .stderr(predicate::str::contains("syntax error"));
}

#[test]
fn missing_script() {
    let dir = tempfile::tempdir().unwrap();
    tinysh(dir.path())
        .arg("does-not-exist.sh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open does-not-exist.sh"));
}

#[test]
fn history_through_a_variable_terminates() {
    let (dir, path) = script("local H=history\n$H 1\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("no such entry"));

    let (dir, path) = script("local H=echo\n$H 1\nlocal H=history\nhistory 1\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .success()
        .stdout("1\n$H 1\n$H 1\n");
}

#[test]
fn not_found_diagnostic_is_redirected() {
    let (dir, path) = script("nonexistentcmd 2> err.txt\n");
    tinysh(dir.path())
        .arg(&path)
        .assert()
        .code(127)
        .stderr("");
    assert_eq!(
        fs::read_to_string(dir.path().join("err.txt")).unwrap(),
        "tinysh: command not found: nonexistentcmd\n"
    );
}
