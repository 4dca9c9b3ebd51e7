//! Integration tests for the classkit binary.
//!
//! Runs the built `classkit` executable against a declaration tree written
//! to a temporary directory.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "classkit.toml",
        "[loader]\nextension = \"json\"\n\n[paths]\n\"App\" = \"app\"\n",
    );
    write(
        dir.path(),
        "app/view/Panel.json",
        r#"{"$className": "App.view.Panel", "xtype": "panel", "config": {"title": "untitled"}}"#,
    );
    write(
        dir.path(),
        "app/view/Grid.json",
        r#"{
            "$className": "App.view.Grid",
            "extend": "App.view.Panel",
            "xtype": "grid",
            "alternateClassName": "App.Grid"
        }"#,
    );
    dir
}

fn classkit(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_classkit"))
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("CLASSKIT_LOG")
        .args(args)
        .output()
        .expect("failed to run classkit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// path / resolve
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_path_uses_manifest_prefix() {
    let dir = project();
    let output = classkit(dir.path(), &["path", "App.view.Grid"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "app/view/Grid.json");
}

#[test]
fn test_resolve_loads_lazily() {
    let dir = project();
    let output = classkit(dir.path(), &["resolve", "App.view.Grid"]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output).trim(), "App.view.Grid");
}

#[test]
fn test_resolve_unknown_fails() {
    let dir = project();
    let output = classkit(dir.path(), &["resolve", "App.view.Nothing"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Class not found"));
}

// ────────────────────────────────────────────────────────────────────────────
// query / inspect / check
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_query_over_loaded_tree() {
    let dir = project();
    let output = classkit(
        dir.path(),
        &["query", "App.*", "--exclude", "App.view.Panel", "--load", "app"],
    );
    assert!(output.status.success(), "{:?}", output);
    let names: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(names, vec!["App.view.Grid"]);
}

#[test]
fn test_inspect_json() {
    let dir = project();
    let output = classkit(dir.path(), &["inspect", "widget.grid", "--json", "--load", "app"]);
    assert!(output.status.success(), "{:?}", output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["name"], "App.view.Grid");
    assert_eq!(report["superclass"], "App.view.Panel");
    assert_eq!(report["alternate_names"][0], "App.Grid");
    assert_eq!(report["xtypes"], serde_json::json!(["panel", "grid"]));
}

#[test]
fn test_check_reports_pending() {
    let dir = project();
    write(
        dir.path(),
        "extra/Orphan.json",
        r#"{"$className": "Extra.Orphan", "extend": "Extra.Missing"}"#,
    );
    let output = classkit(dir.path(), &["check", "--load", "extra"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("Extra.Orphan"));

    let output = classkit(dir.path(), &["check", "--load", "app"]);
    assert!(output.status.success(), "{:?}", output);
}
