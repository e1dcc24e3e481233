//! Integration tests for the wasmtest CLI
//!
//! These tests invoke the actual wasmtest binary and verify:
//! - Exit codes (0 = success, 1 = failing cases or diagnostics, 2 = error)
//! - stdout/stderr output
//! - JSON output format
//! - All commands work end-to-end

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn wasmtest_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_wasmtest"))
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(format!("../../tests/fixtures/{}", name))
}

fn fixture_arg(name: &str) -> String {
    fixture(name).to_str().unwrap().to_string()
}

fn run_wasmtest(args: &[&str]) -> std::process::Output {
    Command::new(wasmtest_bin())
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("WASMTEST_LOG")
        .output()
        .expect("failed to execute wasmtest")
}

fn temp_file(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let output = run_wasmtest(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    let stdout = stdout_of(&output);
    assert!(stdout.contains("wasmtest"));
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "should contain version"
    );
}

// ── Check ─────────────────────────────────────────────────

#[test]
fn test_check_valid_fixture() {
    let output = run_wasmtest(&["check", &fixture_arg("add.json")]);
    assert!(output.status.success(), "valid fixture should exit 0");
    assert!(stdout_of(&output).contains("valid"));
}

#[test]
fn test_check_against_contract() {
    let output = run_wasmtest(&["check", "--contract", "test_add.wasm", &fixture_arg("add.json")]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
}

#[test]
fn test_check_reports_unknown_method() {
    let output = run_wasmtest(&["check", "--contract", "test_add", &fixture_arg("failing.json")]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("error"), "should mention error");
    assert!(stderr.contains("div"), "should name the method");
}

#[test]
fn test_check_bad_literal() {
    let output = run_wasmtest(&["check", &fixture_arg("bad_literal.json")]);
    assert_eq!(output.status.code(), Some(1), "bad literal should exit 1");
    assert!(stderr_of(&output).contains("float"));
}

#[test]
fn test_check_json_output() {
    let output = run_wasmtest(&["check", "--json", &fixture_arg("bad_literal.json")]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("should be valid JSON");
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"], 1);
    assert_eq!(json["cases"], 2);
    assert_eq!(json["diagnostics"][0]["kind"], "literal_error");
    assert_eq!(json["diagnostics"][0]["location"]["case"], 0);
}

#[test]
fn test_check_malformed_fixture() {
    let output = run_wasmtest(&["check", &fixture_arg("malformed.json")]);
    assert_eq!(output.status.code(), Some(2), "malformed document should exit 2");
    assert!(stderr_of(&output).contains("Fixture format error"));
}

#[test]
fn test_check_nonexistent_file() {
    let output = run_wasmtest(&["check", "nonexistent.json"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
}

#[test]
fn test_check_unknown_contract() {
    let output = run_wasmtest(&["check", "--contract", "nope.wasm", &fixture_arg("add.json")]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("test_add.wasm"), "should list available contracts");
}

// ── Fmt & Hash ────────────────────────────────────────────

#[test]
fn test_fmt_canonicalizes() {
    let output = run_wasmtest(&["fmt", &fixture_arg("messy.json")]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains(r#""method":"add","param":"int:1,int:2","expected":"int:3""#));
    assert!(stdout.contains(r#""needContext":false"#));
}

#[test]
fn test_fmt_idempotent() {
    let once = stdout_of(&run_wasmtest(&["fmt", &fixture_arg("runtime.json")]));
    let file = temp_file(&once, ".json");
    let twice = stdout_of(&run_wasmtest(&["fmt", file.path().to_str().unwrap()]));
    assert_eq!(once, twice);
}

#[test]
fn test_hash_is_sha256_hex() {
    let output = run_wasmtest(&["hash", &fixture_arg("add.json")]);
    assert!(output.status.success());
    let hash = stdout_of(&output).trim().to_string();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_hash_stable_under_fmt() {
    let original = stdout_of(&run_wasmtest(&["hash", &fixture_arg("messy.json")]));
    let canonical = stdout_of(&run_wasmtest(&["fmt", &fixture_arg("messy.json")]));
    let file = temp_file(&canonical, ".json");
    let rehashed = stdout_of(&run_wasmtest(&["hash", file.path().to_str().unwrap()]));
    assert_eq!(original, rehashed);
}

#[test]
fn test_hash_malformed() {
    let output = run_wasmtest(&["hash", &fixture_arg("malformed.json")]);
    assert_eq!(output.status.code(), Some(2));
}

// ── Run ───────────────────────────────────────────────────

#[test]
fn test_run_passing_fixture() {
    let output = run_wasmtest(&["run", "--contract", "test_add.wasm", &fixture_arg("add.json")]);
    assert!(output.status.success(), "stdout: {}", stdout_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("PASS"));
    assert!(stdout.contains("4 passed, 0 failed"));
}

#[test]
fn test_run_runtime_fixture() {
    let output = run_wasmtest(&[
        "run",
        "--contract",
        "test_runtime",
        &fixture_arg("runtime.json"),
    ]);
    assert!(output.status.success(), "stdout: {}", stdout_of(&output));
    assert!(stdout_of(&output).contains("6 passed, 0 failed"));
}

#[test]
fn test_run_failing_fixture() {
    let output = run_wasmtest(&["run", "--contract", "test_add.wasm", &fixture_arg("failing.json")]);
    assert_eq!(output.status.code(), Some(1), "failing cases should exit 1");
    let stdout = stdout_of(&output);
    assert!(stdout.contains("FAIL"));
    assert!(stdout.contains("1 passed, 2 failed"));
    assert!(stdout.contains("not registered"));
}

#[test]
fn test_run_bad_literal_fails_only_its_case() {
    let output = run_wasmtest(&[
        "run",
        "--contract",
        "test_add.wasm",
        &fixture_arg("bad_literal.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_of(&output).contains("1 passed, 1 failed"));
}

#[test]
fn test_run_json_output() {
    let output = run_wasmtest(&[
        "run",
        "--json",
        "--contract",
        "test_add.wasm",
        &fixture_arg("failing.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("should be valid JSON");
    assert_eq!(json["passed"], 1);
    assert_eq!(json["failed"], 2);
    let first = &json["groups"][0]["cases"][0];
    assert_eq!(first["outcome"]["status"], "fail");
    assert_eq!(first["outcome"]["kind"], "expectation_mismatch");
    assert_eq!(first["returned"]["type"], "int");
    let third = &json["groups"][0]["cases"][2];
    assert_eq!(third["outcome"]["kind"], "dispatch_not_found");
}

#[test]
fn test_run_quiet_prints_summary_only() {
    let output = run_wasmtest(&[
        "--quiet",
        "run",
        "--contract",
        "test_add.wasm",
        &fixture_arg("add.json"),
    ]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert_eq!(stdout.lines().count(), 1);
    assert!(!stdout.contains("PASS"));
}

#[test]
fn test_run_malformed_fixture() {
    let output = run_wasmtest(&["run", "--contract", "test_add.wasm", &fixture_arg("malformed.json")]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_run_requires_contract() {
    let output = run_wasmtest(&["run", &fixture_arg("add.json")]);
    assert_eq!(output.status.code(), Some(2), "missing --contract is a usage error");
}

// ── Config ────────────────────────────────────────────────

const ADMIN_ONLY: &str = r#"[[{"needContext":true, "method":"check_witness", "expected":"int:1"}]]"#;

#[test]
fn test_run_without_admin_signing() {
    let fixture = temp_file(ADMIN_ONLY, ".json");
    let output = run_wasmtest(&[
        "run",
        "--contract",
        "test_runtime.wasm",
        fixture.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_config_admin_always_signs() {
    let fixture = temp_file(ADMIN_ONLY, ".json");
    let config = temp_file("admin_always_signs = true\n", ".toml");
    let output = run_wasmtest(&[
        "--config",
        config.path().to_str().unwrap(),
        "run",
        "--contract",
        "test_runtime.wasm",
        fixture.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stdout: {}", stdout_of(&output));
}

#[test]
fn test_config_group_selection() {
    let config = temp_file("groups = [1]\n", ".toml");
    let output = run_wasmtest(&[
        "--config",
        config.path().to_str().unwrap(),
        "run",
        "--contract",
        "test_add.wasm",
        &fixture_arg("add.json"),
    ]);
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("1 passed, 0 failed"));
}

#[test]
fn test_config_block_height() {
    let fixture = temp_file(r#"[[{"method":"block_height", "expected":"int:100"}]]"#, ".json");
    let config = temp_file("block_height = 100\n", ".toml");
    let output = run_wasmtest(&[
        "--config",
        config.path().to_str().unwrap(),
        "run",
        "--contract",
        "test_runtime.wasm",
        fixture.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stdout: {}", stdout_of(&output));
}

#[test]
fn test_invalid_config() {
    let config = temp_file("admin = \"not-an-address\"\n", ".toml");
    let output = run_wasmtest(&[
        "--config",
        config.path().to_str().unwrap(),
        "selftest",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("Configuration error"));
}

// ── Selftest & Contracts ──────────────────────────────────

#[test]
fn test_selftest_passes() {
    let output = run_wasmtest(&["selftest"]);
    assert!(output.status.success(), "stdout: {}", stdout_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("test_add.wasm"));
    assert!(stdout.contains("test_destroy.wasm"));
    assert!(!stdout.contains("FAIL"));
}

#[test]
fn test_selftest_json() {
    let output = run_wasmtest(&["selftest", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("should be valid JSON");
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e["report"]["failed"] == 0));
}

#[test]
fn test_contracts_listing() {
    let output = run_wasmtest(&["contracts"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("test_add.wasm"));
    assert!(stdout.contains("add(int, int) -> int"));
    assert!(stdout.contains("check_witness() -> int [context]"));
    assert!(stdout.contains("AQdvwQpoxhSvDiTw6RKC7ZQRDE5mE2Leg5"));
}

#[test]
fn test_contracts_json() {
    let output = run_wasmtest(&["contracts", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("should be valid JSON");
    let add = json
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "test_add.wasm")
        .unwrap();
    assert_eq!(add["address"], "AQdvwQpoxhSvDiTw6RKC7ZQRDE5mE2Leg5");
    assert_eq!(add["methods"]["add"]["params"][0], "int");
    assert_eq!(add["methods"]["add"]["needs_context"], false);
}
