//! Integration tests for the `depot` CLI binary.
//!
//! These tests exercise the CLI as a subprocess, verifying exit codes and
//! output. They do NOT require a running Depot server: commands that
//! would need one are pointed at a closed local port and must fail fast.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::path::Path;
use std::process::Command;

/// Helper: locate the `depot` binary built by `cargo test`.
fn depot_bin() -> String {
    let path = env!("CARGO_BIN_EXE_depot");
    assert!(Path::new(path).exists(), "depot binary not found at {path}");
    path.to_owned()
}

/// Helper: run depot with args and return (`exit_code`, stdout, stderr).
fn run(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(depot_bin())
        .args(args)
        .env("DEPOT_URL", "http://127.0.0.1:1") // Closed port, fails fast
        .env_remove("DEPOT_DEPLOYMENT")
        .env_remove("DEPOT_TOKEN")
        .env_remove("DEPOT_API_KEY")
        .output()
        .expect("failed to execute depot");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0, "depot --version should exit 0");
    assert!(
        stdout.contains("depot"),
        "version output should contain 'depot': {stdout}"
    );
}

#[test]
fn test_help_flag() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0, "depot --help should exit 0");
    assert!(stdout.contains("create"), "help should list 'create'");
    assert!(stdout.contains("get"), "help should list 'get'");
    assert!(stdout.contains("put"), "help should list 'put'");
    assert!(stdout.contains("delete"), "help should list 'delete'");
}

#[test]
fn test_subcommand_help() {
    for sub in ["create", "get", "put", "delete"] {
        let (code, stdout, _) = run(&[sub, "--help"]);
        assert_eq!(code, 0, "{sub} --help should exit 0");
        assert!(!stdout.is_empty(), "{sub} --help should produce output");
    }
}

// ── Missing credentials fail fast ────────────────────────────────────

#[test]
fn test_get_without_deployment_fails_without_polling() {
    // Must not enter the 30-minute poll loop when no deployment id is set.
    let (code, _, stderr) = run(&["get", "some_key"]);
    assert_ne!(code, 0, "get without a deployment id should fail");
    assert!(
        stderr.contains("deployment"),
        "should point at the missing deployment id: {stderr}"
    );
}

#[test]
fn test_put_without_token_fails() {
    let (code, _, stderr) = run(&["--deployment", "some-id", "put", "k", "v"]);
    assert_ne!(code, 0, "put without a token should fail");
    assert!(
        stderr.contains("token"),
        "should point at the missing token: {stderr}"
    );
}

// ── File values ──────────────────────────────────────────────────────

#[test]
fn test_put_missing_file_fails() {
    let (code, _, stderr) = run(&[
        "--deployment",
        "some-id",
        "--token",
        "some-token",
        "put",
        "k",
        "@/tmp/depot-test-nonexistent-file",
    ]);
    assert_ne!(code, 0, "put of a missing file should fail");
    assert!(
        stderr.contains("could not read file"),
        "should report the unreadable file: {stderr}"
    );
}

#[test]
fn test_put_file_reaches_request_stage() {
    // With a readable file and full credentials, the command must get past
    // value resolution and fail only on the unreachable server.
    let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    write!(file, "payload").unwrap();
    let arg = format!("@{}", file.path().display());

    let (code, _, stderr) = run(&[
        "--deployment",
        "some-id",
        "--token",
        "some-token",
        "put",
        "k",
        &arg,
    ]);
    assert_ne!(code, 0, "unreachable server should fail the put");
    assert!(
        stderr.contains("failed to contact server"),
        "failure should be at the HTTP stage, not file reading: {stderr}"
    );
}

// ── Create against unreachable server ────────────────────────────────

#[test]
fn test_create_unreachable_server_fails() {
    let (code, _, stderr) = run(&["create"]);
    assert_ne!(code, 0, "create against a closed port should fail");
    assert!(
        stderr.contains("failed to contact server"),
        "should report the connection failure: {stderr}"
    );
}
