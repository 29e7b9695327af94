use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

const WORKSPACE: &str = r#"
collections:
  - id: api
    requests:
      - id: login
        method: POST
        url: http://127.0.0.1:1/login
      - id: me
        method: GET
        url: http://127.0.0.1:1/me
flows:
  - id: signin
    nodes:
      - { id: n1, alias: login, requestId: login }
      - { id: n2, alias: me, requestId: me }
      - { id: n3, alias: report, requestId: me }
    connectors:
      - { id: c1, sourceNodeId: n1, targetNodeId: n2 }
      - { id: c2, sourceNodeId: n1, targetNodeId: n3, condition: failure }
suites:
  - id: smoke
    items:
      - type: request
        id: i1
        referenceId: login
"#;

fn workspace(dir: &TempDir) -> String {
    let path = dir.path().join("workspace.yaml");
    fs::write(&path, WORKSPACE).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_validate_command() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    let assert = cmd.args(["validate", &path]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("ok: valid workspace"));
}

#[test]
fn test_validate_unparseable_document() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("invalid.yaml");
    fs::write(&path, "collections: [ { id: ").unwrap();

    let mut cmd = Command::cargo_bin("volley").unwrap();
    cmd.args(["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(2); // VALIDATION_FAILED
}

#[test]
fn test_plan_command_dot() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    let assert = cmd
        .args(["plan", "--flow", "signin", "--format", "dot", &path])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("digraph"));
    assert!(stdout.contains("\"n1\" -> \"n3\" [label=\"failure\"]"));
}

#[test]
fn test_plan_command_json_levels() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    let assert = cmd
        .args(["plan", "--flow", "signin", "--format", "json", &path])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["topoOrder"], serde_json::json!(["n1", "n2", "n3"]));
    assert_eq!(v["levels"], serde_json::json!([["n1"], ["n2", "n3"]]));
}

#[test]
fn test_plan_unknown_flow() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    cmd.args(["plan", "--flow", "nope", &path])
        .assert()
        .code(2);
}

#[test]
fn test_run_suite_unknown_suite() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    cmd.args(["run-suite", "--suite", "missing", &path])
        .assert()
        .code(2);
}

#[test]
fn test_run_flow_rejects_malformed_var() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    cmd.args(["run-flow", "--flow", "signin", "--var", "novalue", &path])
        .assert()
        .code(2);
}

#[test]
fn test_run_collection_unreachable_host_fails_run() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    let assert = cmd
        .args([
            "run-collection",
            "--collection",
            "api",
            "--concurrency",
            "2",
            "--timeout",
            "2000",
            "--format",
            "json",
            &path,
        ])
        .assert()
        .code(3); // RUN_FAILED

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(v["status"], "failed");
    assert_eq!(v["progress"]["failed"], 2);
}

#[test]
fn test_run_flow_halts_on_transport_error() {
    let tmp_dir = TempDir::new().unwrap();
    let path = workspace(&tmp_dir);

    let mut cmd = Command::cargo_bin("volley").unwrap();
    let assert = cmd
        .args([
            "run-flow",
            "--flow",
            "signin",
            "--timeout",
            "2000",
            "--format",
            "json",
            &path,
        ])
        .assert()
        .code(3);

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(v["status"], "failed");
    assert_eq!(v["nodeResults"]["n1"]["status"], "failed");
    assert_eq!(v["nodeResults"]["n2"]["status"], "idle");
    assert_eq!(v["executionOrder"], serde_json::json!(["login"]));
}
