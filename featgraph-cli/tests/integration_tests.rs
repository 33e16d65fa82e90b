//! Integration tests for the featgraph CLI
//!
//! Tests end-to-end command behavior using the CLI binary.
//! Uses tempfile for isolated test directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Run featgraph with the given args in the specified directory
fn run_featgraph(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_featgraph"))
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute featgraph command")
}

/// Get stdout as string
fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as string
fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output))
        .unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, stdout(output)))
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// member_age computed from a member table
const MEMBER_PLAN: &str = r#"{
    "nodes": [
        { "kind": "data_source", "external_source_ref": "/data/members" },
        { "kind": "transformation", "inputs": [{ "id": 0 }], "function": { "operator": "age" } }
    ],
    "features": { "member_age": { "node_id": 1 } },
    "data_sources": [
        { "path": "/data/members", "window_secs": 7 },
        { "path": "/data/members", "window_secs": 3 }
    ]
}"#;

/// age_bucket computed from member_age, which lives in another graph
const BUCKET_PLAN: &str = r#"{
    "nodes": [
        { "kind": "external", "name": "member_age" },
        { "kind": "transformation", "inputs": [{ "id": 0 }], "function": { "operator": "bucketize" } }
    ],
    "features": { "age_bucket": { "node_id": 1 } }
}"#;

/// Transformation depending on itself
const CYCLIC_PLAN: &str = r#"{
    "nodes": [
        { "kind": "transformation", "inputs": [{ "id": 0 }] }
    ]
}"#;

// ============================================================================
// Build Command Tests
// ============================================================================

#[test]
fn test_build_json_summary() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", MEMBER_PLAN);

    let output = run_featgraph(temp_dir.path(), &["build", "plan.json", "--format", "json"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    let summary = stdout_json(&output);
    assert_eq!(summary["nodes"], 2);
    assert_eq!(summary["validated"], true);
    assert_eq!(summary["features"][0]["name"], "member_age");
    assert_eq!(summary["features"][0]["node_id"], 1);
    assert_eq!(summary["features"][0]["kind"], "transformation");
    // Repeated windows keep the longest
    assert_eq!(summary["data_sources"][0]["window_secs"], 7);
}

#[test]
fn test_build_writes_graph() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", MEMBER_PLAN);

    let output = run_featgraph(temp_dir.path(), &["build", "plan.json", "-o", "graph.json"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    let graph: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp_dir.path().join("graph.json")).unwrap())
            .unwrap();
    assert_eq!(graph["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(graph["nodes"][1]["id"], 1);
    assert_eq!(graph["feature_names"]["member_age"]["node_id"], 1);
}

#[test]
fn test_build_table_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", MEMBER_PLAN);

    let output = run_featgraph(temp_dir.path(), &["build", "plan.json"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("member_age"), "missing feature in: {}", out);
    assert!(out.contains("/data/members"), "missing data source in: {}", out);
}

#[test]
fn test_build_toml_plan() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(
        temp_dir.path(),
        "plan.toml",
        r#"
[[nodes]]
kind = "data_source"
source_type = "event"
external_source_ref = "/data/clicks"

[[nodes]]
kind = "aggregation"
input = { id = 0 }
function = { operator = "sliding_window_count", parameters = { window = "7d" } }

[features.clicks_7d]
node_id = 1
"#,
    );

    let output = run_featgraph(temp_dir.path(), &["build", "plan.toml", "--format", "json"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    assert_eq!(stdout_json(&output)["features"][0]["kind"], "aggregation");
}

#[test]
fn test_build_rejects_cycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", CYCLIC_PLAN);

    let output = run_featgraph(temp_dir.path(), &["build", "plan.json"]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("cycle"),
        "unexpected stderr: {}",
        stderr(&output)
    );
}

#[test]
fn test_build_no_validate_flag() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", CYCLIC_PLAN);

    let output = run_featgraph(
        temp_dir.path(),
        &["build", "plan.json", "--no-validate", "--format", "json"],
    );
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    assert_eq!(stdout_json(&output)["validated"], false);
}

#[test]
fn test_build_config_disables_validation() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", CYCLIC_PLAN);
    write_file(
        temp_dir.path(),
        ".featgraph.toml",
        "[build]\nvalidate = false\n\n[output]\nformat = \"json\"\n",
    );

    let output = run_featgraph(temp_dir.path(), &["build", "plan.json"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    assert_eq!(stdout_json(&output)["validated"], false);
}

#[test]
fn test_build_feature_on_missing_node() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(
        temp_dir.path(),
        "plan.json",
        r#"{ "nodes": [{ "kind": "data_source" }], "features": { "f": { "node_id": 1 } } }"#,
    );

    let output = run_featgraph(temp_dir.path(), &["build", "plan.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Node id 1 is not defined"));
}

#[test]
fn test_build_missing_plan() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_featgraph(temp_dir.path(), &["build", "nope.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to read plan"));
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_built_graph() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", MEMBER_PLAN);
    let build = run_featgraph(temp_dir.path(), &["build", "plan.json", "-o", "graph.json"]);
    assert!(build.status.success(), "build failed: {}", stderr(&build));

    let output = run_featgraph(temp_dir.path(), &["validate", "graph.json", "--format", "json"]);
    assert!(output.status.success(), "validate failed: {}", stderr(&output));
    let report = stdout_json(&output);
    assert_eq!(report["valid"], true);
    assert_eq!(report["nodes"], 2);
}

#[test]
fn test_validate_dangling_reference() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(
        temp_dir.path(),
        "graph.json",
        r#"{ "nodes": [{ "kind": "aggregation", "id": 0, "input": { "id": 5 } }] }"#,
    );

    let output = run_featgraph(temp_dir.path(), &["validate", "graph.json", "--format", "json"]);
    assert!(!output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["valid"], false);
    assert!(report["error"].as_str().unwrap().contains("references node 5"));
}

// ============================================================================
// Merge Command Tests
// ============================================================================

#[test]
fn test_merge_resolves_externals() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "members.json", MEMBER_PLAN);
    write_file(temp_dir.path(), "bucket.json", BUCKET_PLAN);

    let build = run_featgraph(temp_dir.path(), &["build", "members.json", "-o", "a.json"]);
    assert!(build.status.success(), "build failed: {}", stderr(&build));
    let build = run_featgraph(temp_dir.path(), &["build", "bucket.json", "-o", "b.json"]);
    assert!(build.status.success(), "build failed: {}", stderr(&build));

    let output = run_featgraph(
        temp_dir.path(),
        &["merge", "a.json", "b.json", "-o", "merged.json", "--format", "json"],
    );
    assert!(output.status.success(), "merge failed: {}", stderr(&output));

    let summary = stdout_json(&output);
    assert_eq!(summary["inputs"], 2);
    assert_eq!(summary["input_nodes"], 4);
    assert_eq!(summary["nodes"], 3);
    assert_eq!(summary["unresolved_externals"].as_array().map(Vec::len), Some(0));

    let inspect = run_featgraph(
        temp_dir.path(),
        &["inspect", "merged.json", "--feature", "age_bucket", "--format", "json"],
    );
    assert!(inspect.status.success(), "inspect failed: {}", stderr(&inspect));
    let report = stdout_json(&inspect);
    let ids: Vec<u64> = report["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn test_merge_keeps_huge_reference_dangling() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "members.json", MEMBER_PLAN);
    let build = run_featgraph(temp_dir.path(), &["build", "members.json", "-o", "a.json"]);
    assert!(build.status.success(), "build failed: {}", stderr(&build));
    write_file(
        temp_dir.path(),
        "b.json",
        r#"{ "nodes": [{ "kind": "transformation", "id": 0, "inputs": [{ "id": 4294967294 }] }] }"#,
    );

    let output = run_featgraph(temp_dir.path(), &["merge", "a.json", "b.json"]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("references node 4294967295"),
        "unexpected stderr: {}",
        stderr(&output)
    );
}

#[test]
fn test_merge_duplicate_feature_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "members.json", MEMBER_PLAN);
    let build = run_featgraph(temp_dir.path(), &["build", "members.json", "-o", "a.json"]);
    assert!(build.status.success(), "build failed: {}", stderr(&build));

    let output = run_featgraph(temp_dir.path(), &["merge", "a.json", "a.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already defined"));
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_inspect_lists_nodes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", MEMBER_PLAN);
    let build = run_featgraph(temp_dir.path(), &["build", "plan.json", "-o", "graph.json"]);
    assert!(build.status.success(), "build failed: {}", stderr(&build));

    let output = run_featgraph(temp_dir.path(), &["inspect", "graph.json", "--format", "json"]);
    assert!(output.status.success(), "inspect failed: {}", stderr(&output));
    let report = stdout_json(&output);
    assert_eq!(report["acyclic"], true);
    assert_eq!(report["nodes"][0]["kind"], "data_source");
    assert_eq!(report["nodes"][1]["features"][0], "member_age");
    assert_eq!(report["nodes"][1]["dependencies"][0], 0);
}

#[test]
fn test_inspect_unknown_feature() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "plan.json", MEMBER_PLAN);
    let build = run_featgraph(temp_dir.path(), &["build", "plan.json", "-o", "graph.json"]);
    assert!(build.status.success(), "build failed: {}", stderr(&build));

    let output = run_featgraph(temp_dir.path(), &["inspect", "graph.json", "-f", "missing"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("missing"));
}

#[test]
fn test_inspect_feature_on_missing_node() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(
        temp_dir.path(),
        "graph.json",
        r#"{ "nodes": [{ "kind": "data_source", "id": 0 }], "feature_names": { "ghost": { "node_id": 3 } } }"#,
    );

    let output = run_featgraph(temp_dir.path(), &["inspect", "graph.json", "-f", "ghost"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("does not exist"));
}

// ============================================================================
// General CLI Tests
// ============================================================================

#[test]
fn test_no_command_prints_help() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_featgraph(temp_dir.path(), &[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
}
