//! Integration tests for `minnow install`.
//!
//! These tests use a mock npm registry to avoid network calls.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;
use tar::Builder;
use tempfile::TempDir;

/// `(name, latest, [(version, [(dep, range)])])`
type PackageDef = (
    &'static str,
    &'static str,
    &'static [(&'static str, &'static [(&'static str, &'static str)])],
);

const PACKAGES: &[PackageDef] = &[
    ("left-pad", "1.3.0", &[("1.0.0", &[]), ("1.3.0", &[])]),
    ("a", "1.0.0", &[("1.0.0", &[("b", "^2.0.0")])]),
    ("aa-old", "1.0.0", &[("1.0.0", &[("b", "1.0.0")])]),
    ("b", "2.1.0", &[("1.0.0", &[]), ("2.0.0", &[]), ("2.1.0", &[])]),
    ("loop-x", "1.0.0", &[("1.0.0", &[("loop-y", "1.0.0")])]),
    ("loop-y", "1.0.0", &[("1.0.0", &[("loop-x", "^1.0.0")])]),
    ("needs-missing", "1.0.0", &[("1.0.0", &[("b", "^9.0.0")])]),
];

fn minnow() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_minnow"));
    cmd.env_remove("RUST_LOG").env_remove("MINNOW_NPM_REGISTRY");
    cmd
}

fn find_package(name: &str) -> Option<&'static PackageDef> {
    PACKAGES.iter().find(|(n, _, _)| *n == name)
}

fn create_test_tarball(name: &str, version: &str) -> Vec<u8> {
    let pkg_json = format!(r#"{{"name":"{name}","version":"{version}","main":"index.js"}}"#);
    let index_js = format!("module.exports = '{name}@{version}';");

    let mut tar_bytes = Vec::new();
    {
        let mut builder = Builder::new(&mut tar_bytes);
        for (path, data) in [
            ("package/package.json", pkg_json.as_bytes()),
            ("package/index.js", index_js.as_bytes()),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, data).unwrap();
        }
        builder.finish().unwrap();
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}

fn create_packument(def: &PackageDef, base_url: &str) -> serde_json::Value {
    let (name, latest, versions) = def;
    let versions: serde_json::Map<String, serde_json::Value> = versions
        .iter()
        .map(|(version, deps)| {
            let deps: serde_json::Map<String, serde_json::Value> = deps
                .iter()
                .map(|(n, r)| ((*n).to_string(), serde_json::Value::from(*r)))
                .collect();
            (
                (*version).to_string(),
                serde_json::json!({
                    "name": name,
                    "version": version,
                    "dependencies": deps,
                    "dist": { "tarball": format!("{base_url}/{name}/-/{name}-{version}.tgz") }
                }),
            )
        })
        .collect();

    serde_json::json!({
        "name": name,
        "dist-tags": { "latest": latest },
        "versions": versions,
    })
}

async fn handle_packument(Path(name): Path<String>, State(base_url): State<String>) -> Response {
    match find_package(&name) {
        Some(def) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            create_packument(def, &base_url).to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn handle_tarball(Path((name, tarball)): Path<(String, String)>) -> Response {
    let version = tarball
        .strip_prefix(&format!("{name}-"))
        .and_then(|s| s.strip_suffix(".tgz"))
        .unwrap_or("");

    let published = find_package(&name)
        .is_some_and(|(_, _, versions)| versions.iter().any(|(v, _)| *v == version));

    if published {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/gzip")],
            Body::from(create_test_tarball(&name, version)),
        )
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, "Not found").into_response()
    }
}

/// Start the mock registry on an ephemeral port. Returns the base URL.
fn start_mock_registry() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let state = base_url.clone();

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = Router::new()
                .route("/:name", get(handle_packument))
                .route("/:name/-/:tarball", get(handle_tarball))
                .with_state(state);
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    thread::sleep(Duration::from_millis(100));
    base_url
}

fn create_test_project(deps: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let deps: serde_json::Map<String, serde_json::Value> = deps
        .iter()
        .map(|(n, r)| ((*n).to_string(), serde_json::Value::from(*r)))
        .collect();
    let package_json = serde_json::json!({
        "name": "test-project",
        "version": "1.0.0",
        "dependencies": deps,
    });
    std::fs::write(
        dir.path().join("package.json"),
        serde_json::to_string_pretty(&package_json).unwrap(),
    )
    .unwrap();
    dir
}

fn run_install(project: &TempDir, registry: &str) -> Output {
    minnow()
        .args(["--json", "--registry", registry, "install"])
        .current_dir(project.path())
        .output()
        .expect("failed to run minnow")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

fn installed_version(project: &TempDir, name: &str) -> String {
    let path = project
        .path()
        .join("node_modules")
        .join(name)
        .join("package.json");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    json["version"].as_str().unwrap().to_string()
}

#[test]
fn test_install_left_pad() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("left-pad", "^1.0.0")]);

    let output = run_install(&project, &registry);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["installed"], serde_json::json!({ "left-pad": "^1.0.0" }));
    assert_eq!(json["packages"][0]["action"], "installed");
    assert_eq!(json["packages"][0]["version"], "1.3.0");

    assert!(project.path().join("node_modules/left-pad/index.js").exists());
    assert_eq!(installed_version(&project, "left-pad"), "1.3.0");
}

#[test]
fn test_install_transitive_dependencies() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("a", "1.0.0")]);

    let output = run_install(&project, &registry);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(
        json["installed"],
        serde_json::json!({ "a": "1.0.0", "b": "^2.0.0" })
    );
    assert_eq!(installed_version(&project, "a"), "1.0.0");
    assert_eq!(installed_version(&project, "b"), "2.1.0");
}

#[test]
fn test_install_cycle_terminates() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("loop-x", "1.0.0")]);

    let output = run_install(&project, &registry);
    assert!(output.status.success());

    let json = stdout_json(&output);
    let packages = json["packages"].as_array().unwrap();
    assert_eq!(packages.len(), 3);
    assert_eq!(packages[2]["name"], "loop-x");
    assert_eq!(packages[2]["reason"], "cycle");
}

#[test]
fn test_install_conflict_keeps_newer() {
    let registry = start_mock_registry();
    // Sorted order: a installs b@2.1.0 first, then the top-level b@1.0.0 arrives
    let project = create_test_project(&[("b", "1.0.0"), ("a", "1.0.0")]);

    let output = run_install(&project, &registry);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["installed"]["b"], "^2.0.0");
    assert_eq!(installed_version(&project, "b"), "2.1.0");

    let last = json["packages"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["name"], "b");
    assert_eq!(last["action"], "skipped");
    assert_eq!(last["reason"], "newer-installed");
}

#[test]
fn test_install_conflict_overwrites_older() {
    let registry = start_mock_registry();
    // aa-old places b@1.0.0, then the top-level b@^2.0.0 replaces it
    let project = create_test_project(&[("aa-old", "1.0.0"), ("b", "^2.0.0")]);

    let output = run_install(&project, &registry);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["installed"]["b"], "^2.0.0");
    assert_eq!(installed_version(&project, "b"), "2.1.0");

    let last = json["packages"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["action"], "installed");
    assert_eq!(last["version"], "2.1.0");
    assert_eq!(last["replaced"], "1.0.0");
}

#[test]
fn test_install_unsatisfiable_range_fails() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("needs-missing", "1.0.0")]);

    let output = run_install(&project, &registry);
    assert!(!output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "PKG_VERSION_NOT_FOUND");
}

#[test]
fn test_install_unknown_package_fails() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("does-not-exist", "latest")]);

    let output = run_install(&project, &registry);
    assert!(!output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], "PKG_NOT_FOUND");
    assert!(!project.path().join("node_modules/does-not-exist").exists());
}

#[test]
fn test_install_missing_manifest_fails() {
    let registry = start_mock_registry();
    let project = tempfile::tempdir().unwrap();

    let output = minnow()
        .args(["--json", "--registry", &registry, "install"])
        .current_dir(project.path())
        .output()
        .unwrap();
    assert!(!output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "PKG_MANIFEST_NOT_FOUND");
    assert!(!project.path().join("node_modules").exists());
}

#[test]
fn test_install_human_output() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("left-pad", "latest")]);

    let output = minnow()
        .args(["--registry", &registry, "install"])
        .current_dir(project.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("+ left-pad@1.3.0"), "stdout: {stdout}");
    assert!(stdout.contains("1 installed, 0 skipped"), "stdout: {stdout}");
}

#[test]
fn test_registry_env_var() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("left-pad", "1.0.0")]);

    let output = minnow()
        .args(["--json", "install"])
        .env("MINNOW_NPM_REGISTRY", &registry)
        .current_dir(project.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(installed_version(&project, "left-pad"), "1.0.0");
}
