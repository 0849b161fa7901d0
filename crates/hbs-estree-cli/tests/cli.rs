/*
 * cli.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end tests for the hbs-estree binary.
 */

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../hbs-estree/test-fixtures")
        .join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hbs-estree"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run hbs-estree")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_compiles_file_to_stdout() {
    let input = fixture_path("raw_interpolation.json");
    let output = run(&[input.to_str().unwrap()]);

    assert!(output.status.success());
    let program = stdout_json(&output);
    assert_eq!(program["type"], "Program");
    assert_eq!(program["sourceType"], "module");
    assert_eq!(program["body"][0]["type"], "FunctionDeclaration");
    assert_eq!(program["body"][0]["params"][0]["name"], "data1");
}

#[test]
fn test_export_and_helper_imports() {
    let input = fixture_path("helper_block.json");
    let output = run(&[
        input.to_str().unwrap(),
        "--export",
        "--helper",
        "helper=demo/helper",
    ]);

    assert!(output.status.success());
    let expected: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(fixture_path("helper_block.estree.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(stdout_json(&output), expected);
}

#[test]
fn test_helpers_file_and_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.json");
    let input = fixture_path("helper_block.json");
    let helpers = fixture_path("helpers.json");

    let output = run(&[
        input.to_str().unwrap(),
        "--helpers",
        helpers.to_str().unwrap(),
        "-o",
        out_path.to_str().unwrap(),
        "--pretty",
    ]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(written["body"][0]["type"], "ImportDeclaration");
    assert_eq!(written["body"][0]["source"]["value"], "demo/helper");
}

#[test]
fn test_reads_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_hbs-estree"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{ "type": "Program", "body": [{ "type": "ContentStatement", "value": "hi" }] }"#)
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let program = stdout_json(&output);
    assert_eq!(
        program["body"][0]["body"]["body"][0]["argument"]["value"],
        "hi"
    );
}

#[test]
fn test_unsupported_construct_fails_in_strict_mode() {
    let input = fixture_path("partial.json");
    let output = run(&[input.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[H-1-1]"), "stderr: {}", stderr);
}

#[test]
fn test_legacy_mode_warns_and_succeeds() {
    let input = fixture_path("partial.json");
    let output = run(&[input.to_str().unwrap(), "--legacy", "--diagnostics"]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let report = stderr
        .lines()
        .find(|line| line.starts_with('['))
        .expect("diagnostics JSON line");
    let diagnostics: serde_json::Value = serde_json::from_str(report).unwrap();
    assert_eq!(diagnostics[0]["kind"], "Warning");
    assert_eq!(diagnostics[0]["code"], "H-1-1");
}

#[test]
fn test_invalid_json_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();

    let output = run(&[path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse template AST"), "stderr: {}", stderr);
}
