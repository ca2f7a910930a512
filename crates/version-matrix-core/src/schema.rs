// crates/version-matrix-core/src/schema.rs
// ============================================================================
// Module: Schema Resolution
// Description: Resolved field sets per (version, schema key) and payload checks.
// Purpose: Single authority on which fields are legal for a version.
// Dependencies: version-matrix-config, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! A [`ResolvedSchema`] is the computed view of one schema key in one version:
//! declared fields, the required subset, the optional remainder, and defaults.
//! `required` and `optional` always partition `fields`. Inconsistent
//! configuration is reported as [`ResolveError::SchemaInconsistency`] rather
//! than repaired.
//!
//! Response validation collects every violation instead of stopping at the
//! first; callers decide whether a non-empty [`ValidationResult`] fails a test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::FieldName;
use version_matrix_config::Payload;
use version_matrix_config::SchemaKey;
use version_matrix_config::ValidationMode;
use version_matrix_config::VersionName;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Version is not configured.
    #[error("unknown version {0}")]
    UnknownVersion(String),
    /// Schema key has no field list in the version.
    #[error("version {version} has no schema {schema_key}")]
    UnknownSchema {
        /// Version queried.
        version: VersionName,
        /// Schema key queried.
        schema_key: SchemaKey,
    },
    /// Field sets disagree with each other.
    #[error("schema {schema_key} in version {version} is inconsistent: {detail}")]
    SchemaInconsistency {
        /// Version queried.
        version: VersionName,
        /// Schema key queried.
        schema_key: SchemaKey,
        /// Description of the first violation.
        detail: String,
    },
}

// ============================================================================
// SECTION: Resolved Schema
// ============================================================================

/// Computed field sets for one schema key in one version.
///
/// # Invariants
/// - `required ∪ optional` equals the set of `fields`.
/// - `required ∩ optional` is empty.
/// - Every key of `defaults` appears in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSchema {
    /// Version the schema belongs to.
    pub version: VersionName,
    /// Schema key.
    pub schema_key: SchemaKey,
    /// Declared fields in configuration order.
    pub fields: Vec<FieldName>,
    /// Fields that must be present.
    pub required: BTreeSet<FieldName>,
    /// Fields that may be omitted.
    pub optional: BTreeSet<FieldName>,
    /// Default values by field.
    pub defaults: BTreeMap<FieldName, Value>,
}

impl ResolvedSchema {
    /// Returns true when `field` is declared.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|declared| declared.as_str() == field)
    }

    /// Checks a payload against this schema.
    #[must_use]
    pub fn validate(&self, payload: &Payload, mode: ValidationMode) -> ValidationResult {
        let missing_required = self
            .fields
            .iter()
            .filter(|field| self.required.contains(*field))
            .filter(|field| !payload.contains_key(field.as_str()))
            .cloned()
            .collect();
        let unexpected_fields = match mode {
            ValidationMode::Strict => payload
                .keys()
                .filter(|key| !self.contains(key))
                .map(|key| FieldName::from(key.as_str()))
                .collect(),
            ValidationMode::Lenient => Vec::new(),
        };
        ValidationResult {
            version: self.version.clone(),
            schema_key: self.schema_key.clone(),
            mode,
            missing_required,
            unexpected_fields,
        }
    }
}

// ============================================================================
// SECTION: Validation Result
// ============================================================================

/// Structured outcome of response validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Version validated against.
    pub version: VersionName,
    /// Schema validated against.
    pub schema_key: SchemaKey,
    /// Mode used.
    pub mode: ValidationMode,
    /// Required fields absent from the payload, in schema order.
    pub missing_required: Vec<FieldName>,
    /// Payload keys outside the schema; always empty in lenient mode.
    pub unexpected_fields: Vec<FieldName>,
}

impl ValidationResult {
    /// Returns true when no violation was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.missing_required.is_empty() && self.unexpected_fields.is_empty()
    }

    /// Renders a one-line description of the violations.
    #[must_use]
    pub fn summary(&self) -> String {
        let join = |fields: &[FieldName]| {
            fields.iter().map(FieldName::as_str).collect::<Vec<_>>().join(", ")
        };
        format!(
            "{} {} ({}): missing required [{}], unexpected [{}]",
            self.version,
            self.schema_key,
            self.mode.as_str(),
            join(&self.missing_required),
            join(&self.unexpected_fields)
        )
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Schema resolver over a loaded configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    /// Loaded configuration.
    store: &'a ConfigurationStore,
}

impl<'a> SchemaResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub const fn new(store: &'a ConfigurationStore) -> Self {
        Self {
            store,
        }
    }

    /// Resolves one schema key for one version.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownVersion`], [`ResolveError::UnknownSchema`]
    /// when the version declares no field list for the key, or
    /// [`ResolveError::SchemaInconsistency`] when field sets disagree.
    pub fn resolve(&self, version: &str, schema_key: &str) -> Result<ResolvedSchema, ResolveError> {
        let descriptor = self
            .store
            .get_version_config(version)
            .map_err(|_| ResolveError::UnknownVersion(version.to_string()))?;
        let Some(fields) = descriptor.schema_fields.get(schema_key) else {
            return Err(ResolveError::UnknownSchema {
                version: descriptor.name.clone(),
                schema_key: SchemaKey::from(schema_key),
            });
        };
        descriptor.check_schema(schema_key).map_err(|detail| {
            ResolveError::SchemaInconsistency {
                version: descriptor.name.clone(),
                schema_key: SchemaKey::from(schema_key),
                detail,
            }
        })?;
        let required = descriptor.required_fields.get(schema_key).cloned().unwrap_or_default();
        let optional = descriptor.optional_fields.get(schema_key).cloned().unwrap_or_else(|| {
            fields.iter().filter(|field| !required.contains(*field)).cloned().collect()
        });
        let defaults = descriptor.default_values.get(schema_key).cloned().unwrap_or_default();
        debug!(
            version = %descriptor.name,
            schema_key,
            fields = fields.len(),
            required = required.len(),
            "resolved schema"
        );
        Ok(ResolvedSchema {
            version: descriptor.name.clone(),
            schema_key: SchemaKey::from(schema_key),
            fields: fields.clone(),
            required,
            optional,
            defaults,
        })
    }

    /// Validates a response payload against a resolved schema.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the schema cannot be resolved; validation
    /// violations are reported in the returned [`ValidationResult`].
    pub fn validate_response(
        &self,
        payload: &Payload,
        version: &str,
        schema_key: &str,
        mode: ValidationMode,
    ) -> Result<ValidationResult, ResolveError> {
        let schema = self.resolve(version, schema_key)?;
        let result = schema.validate(payload, mode);
        if !result.is_ok() {
            debug!(
                version,
                schema_key,
                missing = result.missing_required.len(),
                unexpected = result.unexpected_fields.len(),
                "response did not match schema"
            );
        }
        Ok(result)
    }
}
