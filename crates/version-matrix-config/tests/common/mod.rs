// crates/version-matrix-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared fixtures for configuration store tests.
// Purpose: Reduce duplication across integration tests for version-matrix-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use version_matrix_config::ConfigError;
use version_matrix_config::ConfigurationStore;

/// Canonical clinic API configuration shipped at the default location.
pub const CLINIC_CONFIG: &str = include_str!("../../../../tests/config/api_versions.yaml");

/// Loads the canonical clinic configuration.
pub fn clinic_store() -> Result<ConfigurationStore, ConfigError> {
    ConfigurationStore::from_yaml_str(CLINIC_CONFIG)
}

/// Builds a single-version YAML document around the given version body.
pub fn single_version(body: &str) -> String {
    let indented: Vec<String> = body.lines().map(|line| format!("    {line}")).collect();
    format!("versions:\n  v1:\n{}\n", indented.join("\n"))
}

/// Minimal valid version body used as a base for negative tests.
pub const MINIMAL_VERSION: &str = "\
base_url: http://localhost:8000
features: {}
endpoints:
  pets: /api/v1/pets
schema_fields:
  pet_create: [name, species]
";

/// Asserts that an error message contains a substring.
pub fn assert_error_contains<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
