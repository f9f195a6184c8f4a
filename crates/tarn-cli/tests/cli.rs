use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn tarn() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("tarn").unwrap()
}

fn write_program(dir: &tempfile::TempDir, source: &str) -> PathBuf {
    let file = dir.path().join("program.tarn");
    fs::write(&file, source).unwrap();
    file
}

// ── check command ───────────────────────────────────────────

#[test]
fn check_valid_file_prints_signatures() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "main() {\n  var x;\n  x = input;\n  output x;\n  return x;\n}\n",
    );

    tarn()
        .args(["check", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("main: () -> int"));
}

#[test]
fn check_type_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "main() {\n  var x;\n  x = alloc 1;\n  return x;\n}\n");

    tarn()
        .args(["check", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("type error"));
}

#[test]
fn check_undeclared_name_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "main() {\n  return y;\n}\n");

    tarn()
        .args(["check", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("undeclared"));
}

// ── constraints command ─────────────────────────────────────

#[test]
fn constraints_prints_one_block_per_function() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "ident(p) {\n return p;\n}\n\nmain() {\n  var x;\n  x = ident(42);\n  return x;\n}\n",
    );

    tarn()
        .args(["constraints", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("ident:"))
        .stdout(predicate::str::contains("main:"))
        .stdout(predicate::str::contains(
            "\u{27e6}ident@1:0\u{27e7} = (\u{27e6}p@1:6\u{27e7}) -> \u{27e6}p@1:6\u{27e7}",
        ));
}

// ── parse command ───────────────────────────────────────────

#[test]
fn parse_dumps_canonical_source() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "main(){var x;x=alloc 0;*x = 1+2;return *x;}\n",
    );

    tarn()
        .args(["parse", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("main() {"))
        .stdout(predicate::str::contains("var x;"))
        .stdout(predicate::str::contains("(*x) = (1 + 2);"))
        .stdout(predicate::str::contains("return (*x);"));
}

#[test]
fn parse_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "main() {\n  var x\n  return 0;\n}\n");

    tarn()
        .args(["parse", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse error"));
}
