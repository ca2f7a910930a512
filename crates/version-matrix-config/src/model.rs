// crates/version-matrix-config/src/model.rs
// ============================================================================
// Module: Version Matrix Model
// Description: In-memory model for version descriptors, templates, and settings.
// Purpose: Hold the validated form of the version configuration document.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! A [`VersionDescriptor`] carries everything that differs between API
//! versions: base URL, feature flags, endpoint templates, and schema field
//! lists. Descriptors are built once by the configuration store and shared
//! read-only afterwards.
//!
//! Schema field lists obey `required ∪ optional ⊆ fields`; the shared
//! [`check_schema_consistency`] helper enforces the full rule set both at load
//! time and when schemas are resolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use time::Date;

use crate::identifiers::FeatureName;
use crate::identifiers::FieldName;
use crate::identifiers::ResourceName;
use crate::identifiers::SchemaKey;
use crate::identifiers::VersionName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout for API calls in milliseconds.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Maximum request timeout accepted from configuration in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 300_000;
/// Default maximum response body size in bytes.
pub(crate) const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// JSON object payload exchanged with the API under test.
pub type Payload = Map<String, Value>;

/// Response validation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Unknown fields and missing required fields are both violations.
    Strict,
    /// Only missing required fields are violations.
    #[default]
    Lenient,
}

impl ValidationMode {
    /// Returns a stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

// ============================================================================
// SECTION: Version Descriptor
// ============================================================================

/// Configuration record for one API version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDescriptor {
    /// Unique version name.
    pub name: VersionName,
    /// Absolute base URL for the version.
    pub base_url: String,
    /// Whether the version is deprecated.
    pub deprecated: bool,
    /// Optional date after which the version is no longer served.
    pub sunset_date: Option<Date>,
    /// Feature flags declared for the version.
    pub features: BTreeMap<FeatureName, bool>,
    /// Features intentionally retired in this version.
    pub removed_features: BTreeSet<FeatureName>,
    /// Endpoint URL templates keyed by resource.
    pub endpoints: BTreeMap<ResourceName, String>,
    /// Ordered field lists keyed by schema.
    pub schema_fields: BTreeMap<SchemaKey, Vec<FieldName>>,
    /// Required fields keyed by schema.
    pub required_fields: BTreeMap<SchemaKey, BTreeSet<FieldName>>,
    /// Explicit optional fields keyed by schema.
    pub optional_fields: BTreeMap<SchemaKey, BTreeSet<FieldName>>,
    /// Default values keyed by schema and field.
    pub default_values: BTreeMap<SchemaKey, BTreeMap<FieldName, Value>>,
}

impl VersionDescriptor {
    /// Returns the declared flag for a feature, if any.
    #[must_use]
    pub fn feature(&self, feature: &str) -> Option<bool> {
        self.features.get(feature).copied()
    }

    /// Returns the endpoint template for a resource, if any.
    #[must_use]
    pub fn endpoint(&self, resource: &str) -> Option<&str> {
        self.endpoints.get(resource).map(String::as_str)
    }

    /// Checks one schema key against the consistency rules.
    ///
    /// # Errors
    ///
    /// Returns a human-readable detail when the schema is inconsistent or
    /// when no field list exists for `key`.
    pub fn check_schema(&self, key: &str) -> Result<(), String> {
        let fields = self
            .schema_fields
            .get(key)
            .ok_or_else(|| format!("schema {key} has no schema_fields entry"))?;
        check_schema_consistency(
            fields,
            self.required_fields.get(key),
            self.optional_fields.get(key),
            self.default_values.get(key),
        )
    }
}

/// Validates the relationship between a schema's field sets.
///
/// Rules: no duplicate fields, `required ⊆ fields`, `optional ⊆ fields`,
/// `required ∩ optional = ∅`, an explicit optional set must cover
/// `fields − required` exactly, and defaults may only name declared fields.
///
/// # Errors
///
/// Returns a detail string describing the first violation found.
pub fn check_schema_consistency(
    fields: &[FieldName],
    required: Option<&BTreeSet<FieldName>>,
    optional: Option<&BTreeSet<FieldName>>,
    defaults: Option<&BTreeMap<FieldName, Value>>,
) -> Result<(), String> {
    let mut declared = BTreeSet::new();
    for field in fields {
        if !declared.insert(field) {
            return Err(format!("field {field} is declared more than once"));
        }
    }
    if let Some(required) = required
        && let Some(field) = required.iter().find(|field| !declared.contains(field))
    {
        return Err(format!("required field {field} is not declared in schema_fields"));
    }
    if let Some(optional) = optional {
        if let Some(field) = optional.iter().find(|field| !declared.contains(field)) {
            return Err(format!("optional field {field} is not declared in schema_fields"));
        }
        if let Some(required) = required
            && let Some(field) = optional.iter().find(|field| required.contains(*field))
        {
            return Err(format!("field {field} is both required and optional"));
        }
        let unclassified = fields.iter().find(|field| {
            !optional.contains(*field) && !required.is_some_and(|set| set.contains(*field))
        });
        if let Some(field) = unclassified {
            return Err(format!("field {field} is neither required nor optional"));
        }
    }
    if let Some(defaults) = defaults
        && let Some(field) = defaults.keys().find(|field| !declared.contains(field))
    {
        return Err(format!("default value for {field} is not declared in schema_fields"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Test Data Templates
// ============================================================================

/// Test data template for one resource.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDataTemplate {
    /// Base field values shared by every version.
    #[serde(default)]
    pub base_data: Payload,
    /// Version-specific field values applied over `base_data`.
    #[serde(default)]
    pub overrides: BTreeMap<VersionName, Payload>,
    /// Field generators by name; each build draws a fresh value.
    #[serde(default)]
    pub generators: BTreeMap<FieldName, String>,
}

// ============================================================================
// SECTION: Runner Settings
// ============================================================================

/// Execution settings shared by every versioned test in a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSettings {
    /// Request timeout for API calls in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum response body size accepted, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Default response validation mode.
    #[serde(default)]
    pub validation_mode: ValidationMode,
    /// Whether deprecated versions are expanded by default.
    #[serde(default = "default_include_deprecated")]
    pub include_deprecated: bool,
    /// Whether expanded cases run concurrently by default.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            max_response_bytes: default_max_response_bytes(),
            validation_mode: ValidationMode::default(),
            include_deprecated: default_include_deprecated(),
            parallel: false,
        }
    }
}

impl RunnerSettings {
    /// Validates runner limits.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(format!("runner.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"));
        }
        if self.max_response_bytes == 0 {
            return Err("runner.max_response_bytes must be greater than zero".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("runner.user_agent must be non-empty".to_string());
        }
        Ok(())
    }
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default user agent.
fn default_user_agent() -> String {
    format!("version-matrix/{}", env!("CARGO_PKG_VERSION"))
}

/// Default maximum response size.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Deprecated versions are expanded unless disabled.
const fn default_include_deprecated() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions unwrap expected errors.")]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::check_schema_consistency;
    use crate::identifiers::FieldName;

    fn fields(names: &[&str]) -> Vec<FieldName> {
        names.iter().copied().map(FieldName::from).collect()
    }

    fn set(names: &[&str]) -> BTreeSet<FieldName> {
        names.iter().copied().map(FieldName::from).collect()
    }

    #[test]
    fn consistent_schema_passes() {
        let declared = fields(&["id", "name", "breed"]);
        let required = set(&["id", "name"]);
        let optional = set(&["breed"]);
        let result = check_schema_consistency(&declared, Some(&required), Some(&optional), None);
        assert!(result.is_ok());
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let declared = fields(&["id", "id"]);
        let err = check_schema_consistency(&declared, None, None, None).unwrap_err();
        assert!(err.contains("more than once"));
    }

    #[test]
    fn overlapping_required_and_optional_is_rejected() {
        let declared = fields(&["id", "name"]);
        let required = set(&["id"]);
        let optional = set(&["id", "name"]);
        let result = check_schema_consistency(&declared, Some(&required), Some(&optional), None);
        let err = result.unwrap_err();
        assert!(err.contains("both required and optional"));
    }

    #[test]
    fn unclassified_field_with_explicit_optional_is_rejected() {
        let declared = fields(&["id", "name", "breed"]);
        let required = set(&["id"]);
        let optional = set(&["name"]);
        let result = check_schema_consistency(&declared, Some(&required), Some(&optional), None);
        let err = result.unwrap_err();
        assert!(err.contains("breed"));
    }

    #[test]
    fn default_for_undeclared_field_is_rejected() {
        let declared = fields(&["id"]);
        let mut defaults = BTreeMap::new();
        defaults.insert(FieldName::from("color"), json!("brown"));
        let err = check_schema_consistency(&declared, None, None, Some(&defaults)).unwrap_err();
        assert!(err.contains("color"));
    }
}
