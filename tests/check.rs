//! `rbk check` integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn rbk_cmd() -> Command {
    Command::cargo_bin("rbk").unwrap()
}

fn write_runbook(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_clean_runbook_passes() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(
        &dir,
        "main.tx",
        r#"
addon evm {
    chain_id = input.chain_id
    rpc_api_url = input.rpc_api_url
}

action deploy evm_deploy_contract {
    contract = get_contract("SimpleStorage")
    signer = signer.deployer
    confirmations = 1 + 2 * 3
}

output contract_address {
    value = action.deploy.contract_address
}
"#,
    );

    rbk_cmd()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) checked"));
}

#[test]
fn test_syntax_error_reports_location() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "broken.tx", "variable v {\n    value 1\n}\n");

    rbk_cmd()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("broken.tx:2:11:"))
        .stderr(predicate::str::contains("expected `=`, found number"))
        .stdout(predicate::str::contains("1 problem(s) in 1 file(s)"));
}

#[test]
fn test_quoted_names_warn() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(
        &dir,
        "signers.tx",
        "signer \"deployer\" \"evm::secret_key\" {\n    secret_key = input.key\n}\n",
    );

    rbk_cmd()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("signers.tx:1:8:"))
        .stderr(predicate::str::contains("signer name should be a bare identifier"))
        .stderr(predicate::str::contains("signer type should be a bare identifier"));
}

#[test]
fn test_multiple_files_report_in_order() {
    let dir = TempDir::new().unwrap();
    let good = write_runbook(&dir, "a.tx", "input x = 1\n");
    let bad = write_runbook(&dir, "b.tx", "input y = \"open\n");
    let worse = write_runbook(&dir, "c.tx", "output o { value = @ }\n");

    let output = rbk_cmd()
        .arg("check")
        .arg(&good)
        .arg(&bad)
        .arg(&worse)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let b = stderr.find("b.tx:1:").expect("b.tx reported");
    let c = stderr.find("c.tx:1:").expect("c.tx reported");
    assert!(b < c, "{stderr}");
    assert!(stderr.contains("string is never closed"));
    assert!(stderr.contains("unexpected character `@`"));
    assert!(!stderr.contains("a.tx"));
}

#[test]
fn test_glob_patterns() {
    let dir = TempDir::new().unwrap();
    write_runbook(&dir, "one.tx", "input a = 1\n");
    write_runbook(&dir, "two.tx", "variable b { value = [1, 2] }\n");
    write_runbook(&dir, "notes.md", "not a runbook {");

    rbk_cmd()
        .arg("check")
        .arg(format!("{}/*.tx", dir.path().display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 file(s) checked"));
}

#[test]
fn test_glob_without_matches_fails() {
    let dir = TempDir::new().unwrap();

    rbk_cmd()
        .arg("check")
        .arg(format!("{}/*.tx", dir.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no files match"));
}

#[test]
fn test_missing_file_fails() {
    rbk_cmd()
        .arg("check")
        .arg("/nonexistent/main.tx")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read /nonexistent/main.tx"));
}

#[test]
fn test_max_depth_flag() {
    let dir = TempDir::new().unwrap();
    let path = write_runbook(&dir, "deep.tx", "variable v { value = [[[1]]] }\n");

    rbk_cmd().arg("check").arg(&path).assert().success();

    rbk_cmd()
        .arg("--max-depth")
        .arg("2")
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("deep.tx:1:"));
}
