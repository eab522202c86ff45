use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn geneia() -> Command {
    Command::cargo_bin("geneia").expect("binary exists")
}

#[test]
fn run_hello_demo() {
    geneia()
        .arg("run")
        .arg("demos/hello.gn")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello from Geneia!"))
        .stdout(predicate::str::contains("loop\nloop"))
        .stdout(predicate::str::contains("Program exited with code 0"));
}

#[test]
fn run_exit_code_becomes_status() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("fail.gn");
    fs::write(&script, "peat 'bye'\nexit (3)\n").expect("write script");

    geneia()
        .arg("run")
        .arg(&script)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("bye"));
}

#[test]
fn run_can_print_a_record() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("rec.gn");
    fs::write(&script, "peat 'hi'\nexit").expect("write script");

    geneia()
        .args(["run", "--record"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"success\""))
        .stdout(predicate::str::contains("[PRINT] hi"));
}

#[test]
fn run_missing_file_is_an_error() {
    geneia()
        .arg("run")
        .arg("does/not/exist.gn")
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn check_valid_demo() {
    geneia()
        .arg("check")
        .arg("demos/hello.gn")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn check_reports_unclosed_braces() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("broken.gn");
    fs::write(&script, "turn (2) {\n  peat 'x'\nexit").expect("write script");

    geneia()
        .arg("check")
        .arg(&script)
        .assert()
        .failure()
        .stdout(predicate::str::contains("[E013]: 1 unclosed brace(s)"));
}

#[test]
fn check_json_output() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("warn.gn");
    fs::write(&script, "call ghost\nexit").expect("write script");

    let output = geneia()
        .args(["check", "--json"])
        .arg(&script)
        .output()
        .expect("run check");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("check prints JSON");
    assert_eq!(json["valid"], true);
    assert_eq!(json["errors"][0]["code"], "W001");
    assert_eq!(json["errors"][0]["severity"], "warning");
}

#[test]
fn check_with_missing_compiler_falls_back() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("main.gn");
    fs::write(&script, "peat\nexit").expect("write script");

    geneia()
        .args(["check", "--compiler", "/no/such/compiler"])
        .arg(&script)
        .assert()
        .failure()
        .stdout(predicate::str::contains("E003"));
}

#[test]
fn problems_over_a_directory() {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("a.gn"), "peat 'fine'\nexit").expect("write a");
    fs::write(dir.path().join("b.gns"), "{\npeat").expect("write b");
    fs::write(dir.path().join("notes.txt"), "{{{").expect("write notes");

    geneia()
        .arg("problems")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("b.gns:"))
        .stdout(predicate::str::contains("a.gn:").not())
        .stdout(predicate::str::contains(
            "2 error(s), 0 warning(s), 1 info in 2 file(s)",
        ));
}

#[test]
fn problems_json_totals() {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("only.gn"), "call nobody").expect("write file");

    let output = geneia()
        .args(["problems", "--json"])
        .arg(dir.path())
        .output()
        .expect("run problems");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("problems prints JSON");
    assert_eq!(json["totals"]["warnings"], 1);
    assert_eq!(json["totals"]["info"], 1);
    assert_eq!(json["files"].as_array().map(Vec::len), Some(1));
}
