// crates/version-matrix-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests that drive the version-matrix binary.
// Purpose: Verify commands print JSON on success and fail with stderr output.
// Dependencies: version-matrix-cli binary
// ============================================================================
//! ## Overview
//! Writes the clinic configuration to a temporary directory and runs each
//! subcommand against it through the compiled binary.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const CLINIC_CONFIG: &str = include_str!("../../../tests/config/api_versions.yaml");

fn version_matrix_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_version-matrix"))
}

fn clinic_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("api_versions.yaml");
    fs::write(&path, CLINIC_CONFIG).expect("write config");
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(version_matrix_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("VERSION_MATRIX_LOG")
        .output()
        .expect("run version-matrix")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|err| panic!("invalid json {err}: {stdout}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies a valid configuration reports its versions.
#[test]
fn config_validate_lists_versions() {
    let dir = TempDir::new().unwrap();
    let config = clinic_config(&dir);

    let output = run(&config, &["config", "validate"]);

    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["status"], "ok");
    assert_eq!(value["versions"], json!(["v1", "v2"]));
}

/// Verifies schema inconsistencies fail before any command runs.
#[test]
fn invalid_configuration_fails_with_stderr() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    let broken = CLINIC_CONFIG.replace(
        "pet_create: [name, species, owner_id]\n      pet_response: [id, name]\n",
        "pet_create: [name, species, owner_id, microchip_id]\n      pet_response: [id, name]\n",
    );
    assert_ne!(broken, CLINIC_CONFIG);
    fs::write(&path, broken).unwrap();

    let output = run(&path, &["versions"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("microchip_id"), "unexpected stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

/// Verifies feature lookups by name.
#[test]
fn features_lists_supporting_versions() {
    let dir = TempDir::new().unwrap();
    let config = clinic_config(&dir);

    let output = run(&config, &["features", "--feature", "health_records"]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["versions"], json!(["v2"]));
}

/// Verifies schema resolution output.
#[test]
fn schema_resolve_prints_partition() {
    let dir = TempDir::new().unwrap();
    let config = clinic_config(&dir);

    let output = run(&config, &["schema", "resolve", "--version", "v1", "--schema", "pet_create"]);

    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["required"], json!(["name", "owner_id", "species"]));
    assert_eq!(value["optional"], json!(["breed"]));
}

/// Verifies payload building with overrides.
#[test]
fn data_build_applies_overrides() {
    let dir = TempDir::new().unwrap();
    let config = clinic_config(&dir);

    let output = run(
        &config,
        &["data", "build", "--version", "v1", "--resource", "pet", "--set", "name=\"Rex\""],
    );

    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["name"], "Rex");
    assert_eq!(value["species"], "dog");
    assert!(value.get("breed").is_none());
}

/// Verifies endpoint rendering and missing parameters.
#[test]
fn endpoint_renders_templates() {
    let dir = TempDir::new().unwrap();
    let config = clinic_config(&dir);

    let output = run(
        &config,
        &["endpoint", "--version", "v2", "--resource", "health_records", "--param", "pet_id=42"],
    );
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["url"], "/api/v2/pets/42/health-records");

    let missing = run(&config, &["endpoint", "--version", "v2", "--resource", "health_records"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("pet_id"));
}

/// Verifies strict response validation reports unexpected fields.
#[test]
fn response_validate_reports_violations() {
    let dir = TempDir::new().unwrap();
    let config = clinic_config(&dir);
    let body = dir.path().join("body.json");
    fs::write(&body, r#"{"id": 1, "name": "Rex", "extra_field": "x"}"#).unwrap();
    let body_arg = body.to_string_lossy().to_string();
    let base = [
        "response",
        "validate",
        "--version",
        "v1",
        "--schema",
        "pet_response",
        "--payload",
        body_arg.as_str(),
    ];

    let lenient = run(&config, &base);
    assert!(lenient.status.success());

    let mut strict_args = base.to_vec();
    strict_args.extend(["--mode", "strict"]);
    let strict = run(&config, &strict_args);
    assert!(!strict.status.success());
    let value = stdout_json(&strict);
    assert_eq!(value["unexpected_fields"], json!(["extra_field"]));
    assert_eq!(value["missing_required"], json!([]));
}

/// Verifies the plan command shows per-version decisions.
#[test]
fn plan_shows_skip_reasons() {
    let dir = TempDir::new().unwrap();
    let config = clinic_config(&dir);

    let output = run(
        &config,
        &["plan", "--name", "create_health_record", "--requires", "health_records"],
    );

    assert!(output.status.success());
    let rows = stdout_json(&output);
    assert_eq!(rows[0]["case"], "create_health_record[v1]");
    assert_eq!(rows[0]["decision"], "skip");
    assert!(rows[0]["reason"].as_str().unwrap().contains("health_records"));
    assert_eq!(rows[1]["decision"], "execute");
}
