// crates/version-matrix-core/src/factory.rs
// ============================================================================
// Module: Test Data Factory
// Description: Version-aware request payload construction from templates.
// Purpose: Build payloads that are valid for a version before any HTTP call.
// Dependencies: version-matrix-config, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`TestDataFactory::build`] layers values in a fixed order: template base
//! data, the template's per-version overrides, generators for unset fields,
//! schema defaults for unset required fields, and finally caller overrides.
//! Missing required fields are reported before the payload leaves the
//! factory. In [`BuildMode::Schema`] fields outside the resolved schema are
//! dropped; [`BuildMode::Passthrough`] keeps them.
//!
//! Resolved schemas are cached per `(version, schema key)`. Concurrent first
//! access may resolve the same entry twice; the first insert wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;
use tracing::trace;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::FieldName;
use version_matrix_config::Payload;
use version_matrix_config::ResourceName;
use version_matrix_config::SchemaKey;
use version_matrix_config::VersionName;

use crate::generators::GeneratorRegistry;
use crate::schema::ResolveError;
use crate::schema::ResolvedSchema;
use crate::schema::SchemaResolver;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Whether fields outside the resolved schema survive a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Drop fields the schema does not declare.
    #[default]
    Schema,
    /// Keep every field, including undeclared ones.
    Passthrough,
}

/// Test data construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Schema could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Required fields remain unset after every layer was applied.
    #[error("{schema_key} in version {version} is missing required fields: {}", join(.fields))]
    MissingRequiredField {
        /// Version built for.
        version: VersionName,
        /// Schema built against.
        schema_key: SchemaKey,
        /// Unset required fields in schema order.
        fields: Vec<FieldName>,
    },
    /// Template references a generator that is not registered.
    #[error("test_data.{resource}.generators.{field} names unknown generator {generator}")]
    UnknownGenerator {
        /// Template resource.
        resource: ResourceName,
        /// Field the generator fills.
        field: FieldName,
        /// Unregistered generator name.
        generator: String,
    },
}

/// Joins field names for error messages.
fn join(fields: &[FieldName]) -> String {
    fields.iter().map(FieldName::as_str).collect::<Vec<_>>().join(", ")
}

/// Cache key for resolved schemas.
type CacheKey = (VersionName, SchemaKey);

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Builds version-specific request payloads.
#[derive(Debug)]
pub struct TestDataFactory<'a> {
    /// Loaded configuration.
    store: &'a ConfigurationStore,
    /// Named field generators.
    generators: GeneratorRegistry,
    /// Resolved schema cache.
    cache: RwLock<HashMap<CacheKey, Arc<ResolvedSchema>>>,
}

impl<'a> TestDataFactory<'a> {
    /// Creates a factory with the built-in generators.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownGenerator`] when a template names a
    /// generator that is not built in.
    pub fn new(store: &'a ConfigurationStore) -> Result<Self, BuildError> {
        Self::with_generators(store, GeneratorRegistry::builtin())
    }

    /// Creates a factory with a caller-supplied generator registry.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownGenerator`] when a template names a
    /// generator missing from `generators`.
    pub fn with_generators(
        store: &'a ConfigurationStore,
        generators: GeneratorRegistry,
    ) -> Result<Self, BuildError> {
        for (resource, template) in store.templates() {
            for (field, generator) in &template.generators {
                if !generators.contains(generator) {
                    return Err(BuildError::UnknownGenerator {
                        resource: resource.clone(),
                        field: field.clone(),
                        generator: generator.clone(),
                    });
                }
            }
        }
        Ok(Self {
            store,
            generators,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the underlying configuration.
    #[must_use]
    pub const fn store(&self) -> &'a ConfigurationStore {
        self.store
    }

    /// Returns the resolved schema for `(version, schema_key)`, caching it.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the schema cannot be resolved.
    pub fn schema(
        &self,
        version: &str,
        schema_key: &str,
    ) -> Result<Arc<ResolvedSchema>, ResolveError> {
        let key = (VersionName::from(version), SchemaKey::from(schema_key));
        let cached =
            self.cache.read().unwrap_or_else(PoisonError::into_inner).get(&key).cloned();
        if let Some(schema) = cached {
            trace!(version, schema_key, "schema cache hit");
            return Ok(schema);
        }
        let resolved = Arc::new(SchemaResolver::new(self.store).resolve(version, schema_key)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(key).or_insert(resolved)))
    }

    /// Builds a payload for `{resource}_{operation}` in schema mode.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the schema cannot be resolved or a required
    /// field remains unset.
    pub fn build(
        &self,
        version: &str,
        resource: &str,
        operation: &str,
        overrides: &Payload,
    ) -> Result<Payload, BuildError> {
        self.build_with_mode(version, resource, operation, overrides, BuildMode::Schema)
    }

    /// Builds a payload with an explicit [`BuildMode`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the schema cannot be resolved or a required
    /// field remains unset.
    pub fn build_with_mode(
        &self,
        version: &str,
        resource: &str,
        operation: &str,
        overrides: &Payload,
        mode: BuildMode,
    ) -> Result<Payload, BuildError> {
        let resource_name = ResourceName::from(resource);
        let schema_key = SchemaKey::compose(&resource_name, operation);
        let schema = self.schema(version, schema_key.as_str())?;

        let mut payload = Payload::new();
        if let Some(template) = self.store.template(resource) {
            payload.extend(template.base_data.clone());
            if let Some(version_data) = template.overrides.get(version) {
                payload.extend(version_data.clone());
            }
            for (field, name) in &template.generators {
                if payload.contains_key(field.as_str()) {
                    continue;
                }
                let generator =
                    self.generators.get(name).ok_or_else(|| BuildError::UnknownGenerator {
                        resource: resource_name.clone(),
                        field: field.clone(),
                        generator: name.clone(),
                    })?;
                payload.insert(field.to_string(), generator.generate(field));
            }
        }
        for (field, value) in &schema.defaults {
            if schema.required.contains(field) && !payload.contains_key(field.as_str()) {
                payload.insert(field.to_string(), value.clone());
            }
        }
        payload.extend(overrides.clone());

        let missing: Vec<FieldName> = schema
            .fields
            .iter()
            .filter(|field| schema.required.contains(*field))
            .filter(|field| !payload.contains_key(field.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingRequiredField {
                version: schema.version.clone(),
                schema_key,
                fields: missing,
            });
        }
        if mode == BuildMode::Schema {
            payload.retain(|field, _| schema.contains(field));
        }
        debug!(
            version,
            schema_key = %schema_key,
            fields = payload.len(),
            passthrough = mode == BuildMode::Passthrough,
            "built test payload"
        );
        Ok(payload)
    }
}
