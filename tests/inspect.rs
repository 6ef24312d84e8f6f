//! `rbk tokens`, `rbk tree` and `rbk lower` integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn rbk_cmd() -> Command {
    Command::cargo_bin("rbk").unwrap()
}

fn write_runbook(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("main.tx");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_tokens_skip_trivia_by_default() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "# setup\ninput x = 0x1F\n");

    rbk_cmd()
        .arg("tokens")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2:1 Input \"input\""))
        .stdout(predicate::str::contains("2:7 Identifier \"x\""))
        .stdout(predicate::str::contains("2:9 Equals \"=\""))
        .stdout(predicate::str::contains("2:11 HexNumber \"0x1F\""))
        .stdout(predicate::str::contains("LineComment").not())
        .stdout(predicate::str::contains("Eof").not());
}

#[test]
fn test_tokens_with_trivia() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "# setup\ninput x = 1\n");

    rbk_cmd()
        .arg("tokens")
        .arg("--trivia")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1:1 LineComment \"# setup\""))
        .stdout(predicate::str::contains("1:8 Whitespace \"\\n\""));
}

#[test]
fn test_tree_sexp() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "output result { value = a.b / 2 }\n");

    rbk_cmd()
        .arg("tree")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "(output_block name: (identifier result) config: (block",
        ))
        .stdout(predicate::str::contains(
            "value: (binary_expression / left: (reference (identifier a) (identifier b)) right: (number 2))",
        ));
}

#[test]
fn test_tree_json() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "import \"./child.tx\"\n");

    let output = rbk_cmd().arg("tree").arg("-f").arg("json").arg(&path).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tree"]["kind"], "runbook");
    let import = &json["tree"]["children"][0];
    assert_eq!(import["kind"], "import_statement");
    assert_eq!(import["children"][0]["field"], "path");
    assert_eq!(import["children"][0]["text"], "\"./child.tx\"");
    assert_eq!(json["diagnostics"].as_array().unwrap().len(), 0);
}

#[test]
fn test_tree_unknown_format() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "input x = 1\n");

    rbk_cmd()
        .arg("tree")
        .arg("--format")
        .arg("xml")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown format: xml"));
}

#[test]
fn test_lower_json() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(
        &dir,
        "variable fees { base = 2\n limit = 0x10 }\ninput key = env(\"KEY\")\n",
    );

    let output = rbk_cmd().arg("lower").arg(&path).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let variable = &json["variables"][0];
    assert_eq!(variable["name"], "fees");
    assert_eq!(variable["attributes"][1]["name"], "limit");
    assert_eq!(variable["attributes"][1]["value"]["type"], "integer");
    assert_eq!(variable["attributes"][1]["value"]["value"], 16);
    assert_eq!(json["inputs"][0]["value"]["type"], "function_call");
    assert!(json.get("actions").is_none());
}

#[test]
fn test_lower_render() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(
        &dir,
        "output o {value=action.a.b}\n// trailing note\naddon evm {chain_id=1}",
    );

    rbk_cmd()
        .arg("lower")
        .arg("--format")
        .arg("render")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "addon evm {\n    chain_id = 1\n}\n\noutput o {\n    value = action.a.b\n}\n",
        ));
}

#[test]
fn test_lower_reports_skipped_constructs() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "variable v { value = }\ninput ok = 1\n");

    rbk_cmd()
        .arg("lower")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("main.tx:1:"))
        .stdout(predicate::str::contains("\"ok\""));
}
