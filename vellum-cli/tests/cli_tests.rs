//! CLI integration tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn workspace() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("vellum-cli")
        .tempdir()
        .unwrap()
}

#[test]
fn compile_writes_html_next_to_the_input() {
    let dir = workspace();
    let input = dir.path().join("doc.vmd");
    std::fs::write(&input, "---\nname: Demo\n---\n# Hello\n\n.sum {2} {3}\n").unwrap();

    Command::cargo_bin("vellum")
        .unwrap()
        .args(["compile"])
        .arg(&input)
        .assert()
        .success();

    let output = std::fs::read_to_string(dir.path().join("doc.html")).unwrap();
    assert!(output.contains("<title>Demo</title>"));
    assert!(output.contains("Hello"));
    assert!(output.contains("5"));
}

#[test]
fn compile_text_format() {
    let dir = workspace();
    let input = dir.path().join("doc.vmd");
    std::fs::write(&input, ".uppercase {quiet}\n").unwrap();

    Command::cargo_bin("vellum")
        .unwrap()
        .args(["compile", "--format", "text"])
        .arg(&input)
        .assert()
        .success();

    let output = std::fs::read_to_string(dir.path().join("doc.txt")).unwrap();
    assert!(output.contains("QUIET"));
}

#[test]
fn strict_mode_fails_on_undefined_functions() {
    let dir = workspace();
    let input = dir.path().join("doc.vmd");
    std::fs::write(&input, ".nope\n").unwrap();

    // Lenient (default) compilation succeeds and embeds an error box.
    Command::cargo_bin("vellum")
        .unwrap()
        .args(["compile"])
        .arg(&input)
        .assert()
        .success();

    // Strict compilation aborts with a non-zero outcome.
    Command::cargo_bin("vellum")
        .unwrap()
        .args(["compile", "--strict"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn check_reports_failing_calls_as_json() {
    let dir = workspace();
    let input = dir.path().join("doc.vmd");
    std::fs::write(&input, "fine\n\n.nope {x}\n").unwrap();

    Command::cargo_bin("vellum")
        .unwrap()
        .args(["check", "--json"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"function\": \"nope\""));
}

#[test]
fn check_passes_on_a_clean_document() {
    let dir = workspace();
    let input = dir.path().join("doc.vmd");
    std::fs::write(&input, "# Clean\n\n.sum {1} {2}\n").unwrap();

    Command::cargo_bin("vellum")
        .unwrap()
        .args(["check"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("no problems found"));
}
