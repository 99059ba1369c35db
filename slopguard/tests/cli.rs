//! End-to-end tests against the built binary: validation paths and the
//! static assessment, neither of which needs a container runtime.

use std::io::Write;
use std::process::Command;

fn slopguard() -> Command {
    Command::new(env!("CARGO_BIN_EXE_slopguard"))
}

#[test]
fn scan_rejects_unknown_language() {
    let output = slopguard()
        .args(["scan", "requests", "--language", "cobol", "--json"])
        .output()
        .expect("binary runs");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let resp: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json envelope");
    assert_eq!(resp["success"], false);
    assert_eq!(resp["error"], "Unsupported language: cobol");
}

#[test]
fn scan_rejects_empty_package_name() {
    let output = slopguard()
        .args(["scan", "", "--json"])
        .output()
        .expect("binary runs");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let resp: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json envelope");
    assert_eq!(resp["error"], "Package name is required");
}

#[test]
fn check_scores_stdlib_module_zero() {
    let output = slopguard()
        .args(["check", "math", "--language", "py", "--json"])
        .output()
        .expect("binary runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let prior: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json assessment");
    assert_eq!(prior["score"], 0.0);
    assert_eq!(prior["riskLevel"], "low");
    assert_eq!(prior["summary"], "Python stdlib module");
}

#[test]
fn check_flags_nonexistent_package_high() {
    let mut meta = tempfile::NamedTempFile::new().expect("tempfile");
    write!(meta, r#"{{"exists": false}}"#).expect("write metadata");

    let output = slopguard()
        .args([
            "check",
            "totally-made-up-pkg",
            "--json",
            "--metadata-file",
            meta.path().to_str().unwrap(),
        ])
        .output()
        .expect("binary runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let prior: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json assessment");
    assert_eq!(prior["score"], 1.0);
    assert_eq!(prior["riskLevel"], "high");
}

#[test]
fn scan_of_compiled_language_reports_placeholder() {
    let output = slopguard()
        .args(["scan", "some-module", "--language", "go", "--json"])
        .output()
        .expect("binary runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let resp: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json envelope");
    assert_eq!(resp["success"], true);
    assert_eq!(resp["result"]["isMalicious"], false);
}
