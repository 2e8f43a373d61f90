use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const ADD: &str = "node add(a: int; b: int) returns (c: int); let c = a + b; tel";

fn minilustre() -> Command {
    Command::cargo_bin("minilustre").unwrap()
}

#[test]
fn compiles_standard_input() {
    minilustre()
        .args(["--target", "x86_64_linux"])
        .write_stdin(ADD)
        .assert()
        .success()
        .stdout(predicate::str::contains("target triple = \"x86_64-unknown-linux-gnu\""))
        .stdout(predicate::str::contains("define i32 @add(ptr %self.state, i32 %a, i32 %b)"))
        .stdout(predicate::str::contains("declare void @print(ptr)"));
}

#[test]
fn quotes_unicode_names() {
    minilustre()
        .write_stdin("node café() returns (x: int); let x = 1; tel")
        .assert()
        .success()
        .stdout(predicate::str::contains("define i32 @\"café\"(ptr %self.state) {"));
}

#[test]
fn darwin_target() {
    minilustre()
        .args(["--target", "x86_64_darwin", "--threaded"])
        .write_stdin(ADD)
        .assert()
        .success()
        .stdout(predicate::str::contains("target triple = \"x86_64-apple-darwin\""));
}

#[test]
fn emits_canonical_source() {
    minilustre()
        .args(["--emit", "ast"])
        .write_stdin("node add(a, b: int) returns (c: int); let c = a + b; tel")
        .assert()
        .success()
        .stdout("node add (a: int; b: int) returns (c: int);\nlet\n  c = a + b;\ntel\n");
}

#[test]
fn emits_tree_and_tokens() {
    minilustre()
        .args(["--emit", "tree"])
        .write_stdin(ADD)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("node add (5..8)\n"));

    minilustre()
        .args(["--emit", "tokens"])
        .write_stdin("x = 1;")
        .assert()
        .success()
        .stdout(predicate::str::contains("Identifier 0..1 \"x\"").and(predicate::str::ends_with("Eof 6..6\n")));
}

#[test]
fn reads_and_writes_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("add.lus");
    let output = dir.path().join("out").join("add.ll");
    fs::write(&input, ADD).unwrap();

    minilustre()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout("");

    let ir = fs::read_to_string(&output).unwrap();
    assert!(ir.contains("%t.0 = add i32 %a, %b"));
}

#[test]
fn reports_undefined_node() {
    minilustre()
        .write_stdin("node f() returns (x: int); let x = g(1); tel")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to compile"))
        .stderr(predicate::str::contains("35..36: in node f: undefined node g"));
}

#[test]
fn reports_syntax_error() {
    minilustre()
        .args(["--emit", "ast"])
        .write_stdin("node f() returns (); let tel")
        .assert()
        .failure()
        .stderr(predicate::str::contains("node f doesn't have any output parameter"));
}

#[test]
fn reports_missing_input_file() {
    minilustre()
        .args(["--input", "/nonexistent/minilustre/input.lus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read input file"));
}
