use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn write_source(path: &Path, source: &str) {
    fs::write(path, source).expect("write source");
}

#[test]
fn runs_a_program_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("hello.opal");
    write_source(&input, "print('hello')\nprint(40 + 2)\n");

    cargo_bin_cmd!("opal")
        .arg(&input)
        .assert()
        .success()
        .stdout("hello\n42\n")
        .stderr(predicate::str::contains("compiling"));
}

#[test]
fn reads_the_program_from_stdin() {
    cargo_bin_cmd!("opal")
        .write_stdin("print(7)\n")
        .assert()
        .success()
        .stdout("7\n");
}

#[test]
fn emit_ir_prints_the_module() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("ir.opal");
    write_source(&input, "print(1)\n");

    cargo_bin_cmd!("opal")
        .arg(&input)
        .arg("--emit-ir")
        .assert()
        .success()
        .stdout(predicate::str::contains("define void @main()"))
        .stdout(predicate::str::contains("; ModuleID = 'opal-lang'"));
}

#[test]
fn no_run_only_verifies() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("verify.opal");
    write_source(&input, "print('not printed')\n");

    cargo_bin_cmd!("opal")
        .arg(&input)
        .arg("--no-run")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("module verified"));
}

#[test]
fn codegen_errors_exit_nonzero() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("broken.opal");
    write_source(&input, "print(missing)\n");

    cargo_bin_cmd!("opal")
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[codegen]"))
        .stderr(predicate::str::contains("Undefined variable: 'missing'"));
}

#[test]
fn missing_file_is_reported() {
    cargo_bin_cmd!("opal")
        .arg("does-not-exist.opal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read"));
}
