// crates/version-matrix-config/src/identifiers.rs
// ============================================================================
// Module: Version Matrix Identifiers
// Description: Opaque identifiers for versions, features, fields, and schemas.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as plain strings. They are validated at
//! configuration load time rather than within these wrappers, so callers can
//! construct them freely in tests and assertions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// API version name (for example `v1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionName(String);

impl VersionName {
    /// Creates a new version name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the version name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for VersionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VersionName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VersionName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Feature flag name (for example `health_records`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureName(String);

impl FeatureName {
    /// Creates a new feature name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the feature name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for FeatureName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FeatureName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Payload field name declared by a schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldName(String);

impl FieldName {
    /// Creates a new field name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the field name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Resource name used for endpoint and template lookups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    /// Creates a new resource name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the resource name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Schema key, conventionally `{resource}_{operation}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaKey(String);

impl SchemaKey {
    /// Creates a new schema key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the schema key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the conventional `{resource}_{operation}` schema key.
    #[must_use]
    pub fn compose(resource: &ResourceName, operation: &str) -> Self {
        Self(format!("{}_{operation}", resource.as_str()))
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for SchemaKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SchemaKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SchemaKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use super::FeatureName;
    use super::ResourceName;
    use super::SchemaKey;
    use super::VersionName;

    #[test]
    fn compose_joins_resource_and_operation() {
        let key = SchemaKey::compose(&ResourceName::from("health_record"), "create");
        assert_eq!(key.as_str(), "health_record_create");
        assert_eq!(key, SchemaKey::from("health_record_create"));
    }

    #[test]
    fn string_keyed_lookups_borrow_as_str() {
        let mut schemas: BTreeMap<SchemaKey, usize> = BTreeMap::new();
        schemas.insert(SchemaKey::from("pet_create"), 4);
        assert_eq!(schemas.get("pet_create"), Some(&4));
        assert_eq!(schemas.get("pet_response"), None);

        let removed: BTreeSet<FeatureName> = BTreeSet::from([FeatureName::from("legacy_export")]);
        assert!(removed.contains("legacy_export"));
        assert!(!removed.contains("health_records"));
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let versions = vec![VersionName::from("v1"), VersionName::from("v2")];
        assert_eq!(serde_json::to_string(&versions).ok(), Some(r#"["v1","v2"]"#.to_string()));

        let parsed: Option<BTreeMap<FeatureName, bool>> =
            serde_json::from_str(r#"{"health_records": true}"#).ok();
        let expected = BTreeMap::from([(FeatureName::from("health_records"), true)]);
        assert_eq!(parsed, Some(expected));
    }

    #[test]
    fn display_matches_the_wrapped_string() {
        assert_eq!(VersionName::new("v2").to_string(), "v2");
        assert_eq!(ResourceName::from(String::from("pets")).to_string(), "pets");
    }
}
