// crates/version-matrix-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Shared fixtures for resolver and factory tests.
// Purpose: Load the canonical clinic configuration once per test.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use serde_json::Value;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::Payload;

/// Canonical clinic API configuration shipped at the default location.
pub const CLINIC_CONFIG: &str = include_str!("../../../../tests/config/api_versions.yaml");

/// Loads the canonical clinic configuration.
pub fn clinic_store() -> ConfigurationStore {
    match ConfigurationStore::from_yaml_str(CLINIC_CONFIG) {
        Ok(store) => store,
        Err(err) => panic!("clinic config failed to load: {err}"),
    }
}

/// Converts a JSON object literal into a payload.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}
