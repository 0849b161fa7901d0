/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for hbs-estree using parser output fixtures.
 */

use hbs_estree::diagnostics::codes;
use hbs_estree::runtime::{Runtime, Value};
use hbs_estree::{
    CompileError, CompileOptions, Compilation, MapResolver, Node, compile, compile_with_resolver,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

/// Helper to load a parser AST from fixtures
fn load_ast(name: &str) -> Node {
    let contents = std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to read fixture: {}", name));
    Node::from_json(&contents).unwrap_or_else(|e| panic!("Failed to parse {}: {}", name, e))
}

fn compile_fixture(name: &str) -> Compilation {
    compile(&load_ast(name), &CompileOptions::default()).unwrap()
}

fn passthrough() -> Runtime {
    let mut runtime = Runtime::new();
    runtime.register_helper("helper", |call| call.render(Value::object()));
    runtime
}

#[test]
fn test_raw_interpolation() {
    let compilation = compile_fixture("raw_interpolation.json");
    let out = Runtime::new()
        .render(&compilation.program, json!({ "world": "world" }))
        .unwrap();
    assert_eq!(out, "Hello world");
    assert!(compilation.diagnostics.is_empty());
}

#[test]
fn test_comment() {
    let compilation = compile_fixture("comment.json");
    let out = Runtime::new().render(&compilation.program, json!({})).unwrap();
    assert_eq!(out, "Hello ");
}

#[test]
fn test_helper_block_matches_expected_estree() {
    let resolver = MapResolver::from_file(&fixture_path("helpers.json")).unwrap();
    let options = CompileOptions::default().with_export(true);
    let compilation =
        compile_with_resolver(&load_ast("helper_block.json"), &options, &resolver).unwrap();

    let expected: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(fixture_path("helper_block.estree.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(serde_json::to_value(&compilation.program).unwrap(), expected);

    let out = passthrough().render(&compilation.program, json!({})).unwrap();
    assert_eq!(out, "Hello world");
}

#[test]
fn test_nested_helpers() {
    let compilation = compile_fixture("nested_helpers.json");
    let out = passthrough()
        .render(&compilation.program, json!({ "world": "Earth" }))
        .unwrap();
    assert_eq!(out, "Hello world from Earth");
}

#[test]
fn test_if_else() {
    let compilation = compile_fixture("if_else.json");
    let runtime = Runtime::new();
    assert_eq!(
        runtime
            .render(&compilation.program, json!({ "online": true }))
            .unwrap(),
        "Hello world"
    );
    assert_eq!(
        runtime
            .render(&compilation.program, json!({ "online": false }))
            .unwrap(),
        "Hello moon"
    );
}

#[test]
fn test_unless() {
    let compilation = compile_fixture("unless.json");
    let runtime = Runtime::new();
    assert_eq!(
        runtime
            .render(&compilation.program, json!({ "online": true }))
            .unwrap(),
        "Hello "
    );
    assert_eq!(
        runtime
            .render(&compilation.program, json!({ "online": false }))
            .unwrap(),
        "Hello world"
    );
}

#[test]
fn test_helper_hash() {
    let compilation = compile_fixture("helper_hash.json");

    let mut runtime = Runtime::new();
    runtime.register_helper("helper", |call| {
        Ok(Value::String(format!(
            "{}x{}",
            call.hash("x").to_js_string(),
            call.hash("count").to_js_string()
        )))
    });
    let out = runtime
        .render(&compilation.program, json!({ "world": { "name": "Earth" } }))
        .unwrap();
    assert_eq!(out, "Hello Earthx2");
}

#[test]
fn test_partial_strict_and_legacy() {
    let ast = load_ast("partial.json");

    let err = compile(&ast, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::Unsupported { .. }));
    assert_eq!(
        err.to_string(),
        "Unsupported construct: partial (PartialStatement) at 1:6"
    );

    let compilation = compile(&ast, &CompileOptions::default().with_strict(false)).unwrap();
    assert_eq!(compilation.diagnostics.len(), 1);
    assert_eq!(compilation.diagnostics[0].code, codes::UNSUPPORTED_CONSTRUCT);
    let out = Runtime::new().render(&compilation.program, json!({})).unwrap();
    assert_eq!(out, "Hello ");
}

#[test]
fn test_compiling_twice_gives_identical_output() {
    let resolver = MapResolver::from_file(&fixture_path("helpers.json")).unwrap();
    let ast = load_ast("nested_helpers.json");
    let first = compile_with_resolver(&ast, &CompileOptions::default(), &resolver).unwrap();
    let second = compile_with_resolver(&ast, &CompileOptions::default(), &resolver).unwrap();

    assert_eq!(
        serde_json::to_string(&first.program).unwrap(),
        serde_json::to_string(&second.program).unwrap()
    );
    // One import even though the helper is used twice
    assert_eq!(first.program.imports().count(), 1);
}
