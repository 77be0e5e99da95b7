//! Integration tests for `minnow add` and command dispatch.
//!
//! `add` only edits package.json, so no registry is needed.

use std::path::Path;
use std::process::{Command, Output};

fn minnow(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_minnow"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        // Unroutable: any network access would fail the test
        .env("MINNOW_NPM_REGISTRY", "http://127.0.0.1:9/")
        .output()
        .expect("failed to run minnow")
}

fn read_manifest(dir: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(dir.join("package.json")).unwrap()).unwrap()
}

fn write_manifest(dir: &Path, content: &str) {
    std::fs::write(dir.join("package.json"), content).unwrap();
}

#[test]
fn test_add_with_range() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), r#"{"name":"app","version":"1.0.0"}"#);

    let output = minnow(dir.path(), &["add", "left-pad@^1.0.0"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let manifest = read_manifest(dir.path());
    assert_eq!(manifest["dependencies"]["left-pad"], "^1.0.0");
    assert_eq!(manifest["name"], "app");
    // add never installs
    assert!(!dir.path().join("node_modules").exists());
}

#[test]
fn test_add_without_range_records_latest() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), r#"{"dependencies":{"other":"2.0.0"}}"#);

    let output = minnow(dir.path(), &["--json", "add", "left-pad"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["name"], "left-pad");
    assert_eq!(json["range"], "latest");

    let manifest = read_manifest(dir.path());
    assert_eq!(manifest["dependencies"]["left-pad"], "latest");
    assert_eq!(manifest["dependencies"]["other"], "2.0.0");
}

#[test]
fn test_add_scoped_package() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "{}");

    let output = minnow(dir.path(), &["add", "@types/node@^20"]);
    assert!(output.status.success());

    assert_eq!(read_manifest(dir.path())["dependencies"]["@types/node"], "^20");
}

#[test]
fn test_add_overwrites_previous_range() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), r#"{"dependencies":{"left-pad":"1.0.0"}}"#);

    let output = minnow(dir.path(), &["add", "left-pad@1.3.0"]);
    assert!(output.status.success());

    assert_eq!(read_manifest(dir.path())["dependencies"]["left-pad"], "1.3.0");
}

#[test]
fn test_add_missing_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = minnow(dir.path(), &["--json", "add", "left-pad"]);
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "PKG_MANIFEST_NOT_FOUND");
    assert!(!dir.path().join("package.json").exists());
}

#[test]
fn test_add_invalid_spec_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "{}");

    let output = minnow(dir.path(), &["--json", "add", "left-pad@"]);
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["code"], "PKG_SPEC_INVALID");
    assert_eq!(std::fs::read_to_string(dir.path().join("package.json")).unwrap(), "{}");
}

#[test]
fn test_no_command_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), r#"{"dependencies":{"left-pad":"1.0.0"}}"#);

    let output = minnow(dir.path(), &[]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "stdout: {stdout}");
    assert!(!dir.path().join("node_modules").exists());
}

#[test]
fn test_unknown_command_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), r#"{"dependencies":{"left-pad":"1.0.0"}}"#);

    let output = minnow(dir.path(), &["frobnicate"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
    assert!(!dir.path().join("node_modules").exists());
    assert_eq!(
        read_manifest(dir.path()),
        serde_json::json!({ "dependencies": { "left-pad": "1.0.0" } })
    );
}

#[test]
fn test_version_command() {
    let dir = tempfile::tempdir().unwrap();

    let output = minnow(dir.path(), &["--json", "version"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["registry"], "http://127.0.0.1:9/");
}
