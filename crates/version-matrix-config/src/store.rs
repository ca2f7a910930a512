// crates/version-matrix-config/src/store.rs
// ============================================================================
// Module: Configuration Store
// Description: Loading and validation of the version configuration document.
// Purpose: Provide the single, immutable source of truth for version differences.
// Dependencies: serde, serde_json, serde_yaml, time, tracing, url
// ============================================================================

//! ## Overview
//! The configuration store parses a YAML or JSON document describing every
//! supported API version, validates it fail-closed, and then serves read-only
//! lookups. Version order is the insertion order of the `versions` mapping.
//!
//! Authoring bugs (missing sections, inconsistent schema field sets, malformed
//! templates) fail at load time. Unknown URL template parameters are kept as
//! warnings because new resources routinely introduce new parameters before the
//! vocabulary is updated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Mapping;
use thiserror::Error;
use time::Date;
use time::macros::format_description;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::identifiers::FeatureName;
use crate::identifiers::FieldName;
use crate::identifiers::ResourceName;
use crate::identifiers::SchemaKey;
use crate::identifiers::VersionName;
use crate::model::RunnerSettings;
use crate::model::TestDataTemplate;
use crate::model::VersionDescriptor;
use crate::template::TemplateError;
use crate::template::UrlParams;
use crate::template::is_parameter_name;
use crate::template::render_template;
use crate::template::template_parameters;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional configuration location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "tests/config/api_versions.yaml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "VERSION_MATRIX_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Parameter vocabulary used when the document does not declare one.
pub const DEFAULT_PARAMETER_VOCABULARY: &[&str] = &[
    "id",
    "pet_id",
    "owner_id",
    "appointment_id",
    "record_id",
    "vet_id",
    "user_id",
    "clinic_id",
    "invoice_id",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// Document is not valid YAML or JSON, or has the wrong shape.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Document is well-formed but semantically invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Required, optional, and declared field sets disagree.
    #[error("schema inconsistency in {version}.{schema_key}: {detail}")]
    SchemaInconsistency {
        /// Version declaring the schema.
        version: VersionName,
        /// Offending schema key.
        schema_key: SchemaKey,
        /// Description of the mismatch.
        detail: String,
    },
}

/// Lookup errors raised by a loaded store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Version is not configured.
    #[error("unknown version: {0}")]
    UnknownVersion(String),
    /// Version has no endpoint for the resource.
    #[error("version {version} has no endpoint for resource {resource}")]
    UnknownEndpoint {
        /// Version queried.
        version: VersionName,
        /// Resource queried.
        resource: String,
    },
    /// A template placeholder had no supplied value.
    #[error("endpoint {version}.{resource} requires parameter {parameter}")]
    MissingParameter {
        /// Version queried.
        version: VersionName,
        /// Resource queried.
        resource: String,
        /// Placeholder without a value.
        parameter: String,
    },
    /// A supplied parameter value cannot fill one path segment.
    #[error("endpoint {version}.{resource} parameter {parameter} has invalid value {value:?}")]
    InvalidParameter {
        /// Version queried.
        version: VersionName,
        /// Resource queried.
        resource: String,
        /// Placeholder name.
        parameter: String,
        /// Rejected value.
        value: String,
    },
    /// Rendered URL could not be joined onto the base URL.
    #[error("endpoint {version}.{resource} produced an invalid url: {detail}")]
    InvalidUrl {
        /// Version queried.
        version: VersionName,
        /// Resource queried.
        resource: String,
        /// Parser detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: Warnings
// ============================================================================

/// Non-fatal finding recorded while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Version the finding belongs to.
    pub version: VersionName,
    /// Resource whose endpoint template triggered the finding.
    pub resource: ResourceName,
    /// Placeholder name missing from the parameter vocabulary.
    pub parameter: String,
}

impl ConfigWarning {
    /// Returns a human-readable description.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "endpoint {}.{} uses parameter {{{}}} outside the documented vocabulary",
            self.version, self.resource, self.parameter
        )
    }
}

// ============================================================================
// SECTION: Document Format
// ============================================================================

/// Supported document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

impl DocumentFormat {
    /// Picks the format from a file extension (`.json` or YAML otherwise).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

// ============================================================================
// SECTION: Raw Document
// ============================================================================

/// Top-level document as written by configuration authors.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    /// Version entries in document order.
    #[serde(default)]
    versions: Option<Mapping>,
    /// Optional URL parameter vocabulary.
    #[serde(default)]
    parameters: Option<Vec<String>>,
    /// Optional feature prerequisite map.
    #[serde(default)]
    feature_dependencies: BTreeMap<FeatureName, Vec<FeatureName>>,
    /// Optional test data templates.
    #[serde(default)]
    test_data: BTreeMap<ResourceName, TestDataTemplate>,
    /// Optional runner settings.
    #[serde(default)]
    runner: RunnerSettings,
}

/// Version entry as written by configuration authors.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVersion {
    /// Base URL (required).
    #[serde(default)]
    base_url: Option<String>,
    /// Feature flags (required).
    #[serde(default)]
    features: Option<BTreeMap<FeatureName, bool>>,
    /// Endpoint templates (required).
    #[serde(default)]
    endpoints: Option<BTreeMap<ResourceName, String>>,
    /// Schema field lists (required).
    #[serde(default)]
    schema_fields: Option<BTreeMap<SchemaKey, Vec<FieldName>>>,
    /// Deprecation marker.
    #[serde(default)]
    deprecated: bool,
    /// Sunset date in `YYYY-MM-DD` form.
    #[serde(default)]
    sunset_date: Option<String>,
    /// Required fields by schema.
    #[serde(default)]
    required_fields: BTreeMap<SchemaKey, BTreeSet<FieldName>>,
    /// Optional fields by schema.
    #[serde(default)]
    optional_fields: BTreeMap<SchemaKey, BTreeSet<FieldName>>,
    /// Default values by schema.
    #[serde(default)]
    default_values: BTreeMap<SchemaKey, BTreeMap<FieldName, Value>>,
    /// Features retired in this version.
    #[serde(default)]
    removed_features: BTreeSet<FeatureName>,
}

// ============================================================================
// SECTION: Configuration Store
// ============================================================================

/// Immutable, validated set of version descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationStore {
    /// Descriptors keyed by version name.
    versions: BTreeMap<VersionName, Arc<VersionDescriptor>>,
    /// Version names in document order.
    order: Vec<VersionName>,
    /// URL parameter vocabulary.
    parameters: BTreeSet<String>,
    /// Feature prerequisite map declared by the document.
    feature_dependencies: BTreeMap<FeatureName, Vec<FeatureName>>,
    /// Test data templates keyed by resource.
    templates: BTreeMap<ResourceName, TestDataTemplate>,
    /// Runner settings.
    settings: RunnerSettings,
    /// Non-fatal findings recorded during load.
    warnings: Vec<ConfigWarning>,
}

impl ConfigurationStore {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then `VERSION_MATRIX_CONFIG`, then [`DEFAULT_CONFIG_PATH`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading, parsing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let store = Self::from_str_with_format(content, DocumentFormat::from_path(&resolved))?;
        info!(
            path = %resolved.display(),
            versions = store.order.len(),
            warnings = store.warnings.len(),
            "loaded version configuration"
        );
        Ok(store)
    }

    /// Parses and validates a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Self::from_str_with_format(content, DocumentFormat::Yaml)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Self::from_str_with_format(content, DocumentFormat::Json)
    }

    /// Parses and validates a document in the given format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_str_with_format(
        content: &str,
        format: DocumentFormat,
    ) -> Result<Self, ConfigError> {
        let raw: RawDocument = match format {
            DocumentFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?
            }
            DocumentFormat::Json => {
                serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?
            }
        };
        Self::from_raw(raw)
    }

    /// Builds a store from already-constructed descriptors, applying the same
    /// validation as document loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when descriptors are invalid or duplicated.
    pub fn from_descriptors(descriptors: Vec<VersionDescriptor>) -> Result<Self, ConfigError> {
        let parameters = DEFAULT_PARAMETER_VOCABULARY.iter().map(ToString::to_string).collect();
        Self::assemble(
            descriptors,
            parameters,
            BTreeMap::new(),
            BTreeMap::new(),
            RunnerSettings::default(),
        )
    }

    /// Returns a copy of the store with the given test data templates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a template overrides an unknown version.
    pub fn with_templates(
        mut self,
        templates: BTreeMap<ResourceName, TestDataTemplate>,
    ) -> Result<Self, ConfigError> {
        validate_templates(&templates, &self.versions)?;
        self.templates = templates;
        Ok(self)
    }

    /// Returns a copy of the store with the given feature prerequisite map.
    #[must_use]
    pub fn with_feature_dependencies(
        mut self,
        dependencies: BTreeMap<FeatureName, Vec<FeatureName>>,
    ) -> Self {
        self.feature_dependencies = dependencies;
        self
    }

    /// Returns a copy of the store with the given runner settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the settings are out of range.
    pub fn with_settings(mut self, settings: RunnerSettings) -> Result<Self, ConfigError> {
        settings.validate().map_err(ConfigError::Invalid)?;
        self.settings = settings;
        Ok(self)
    }

    /// Returns the descriptor for a version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownVersion`] when the version is not configured.
    pub fn get_version_config(&self, version: &str) -> Result<&VersionDescriptor, StoreError> {
        self.versions
            .get(version)
            .map(AsRef::as_ref)
            .ok_or_else(|| StoreError::UnknownVersion(version.to_string()))
    }

    /// Returns a shared handle to a version descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownVersion`] when the version is not configured.
    pub fn version_handle(&self, version: &str) -> Result<Arc<VersionDescriptor>, StoreError> {
        self.versions
            .get(version)
            .cloned()
            .ok_or_else(|| StoreError::UnknownVersion(version.to_string()))
    }

    /// Returns every configured version in document order.
    #[must_use]
    pub fn get_supported_versions(&self) -> &[VersionName] {
        &self.order
    }

    /// Iterates descriptors in document order.
    pub fn descriptors(&self) -> impl Iterator<Item = &VersionDescriptor> {
        self.order.iter().filter_map(|name| self.versions.get(name).map(AsRef::as_ref))
    }

    /// Returns the document position of a version.
    #[must_use]
    pub fn version_index(&self, version: &str) -> Option<usize> {
        self.order.iter().position(|name| name.as_str() == version)
    }

    /// Compares two versions by document order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownVersion`] when either version is unknown.
    pub fn compare_versions(&self, left: &str, right: &str) -> Result<Ordering, StoreError> {
        let left_index = self.require_index(left)?;
        let right_index = self.require_index(right)?;
        Ok(left_index.cmp(&right_index))
    }

    /// Returns versions within the inclusive `[min, max]` bounds in document order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownVersion`] when a bound is not configured.
    pub fn versions_between(
        &self,
        min: Option<&str>,
        max: Option<&str>,
    ) -> Result<Vec<VersionName>, StoreError> {
        let lower = min.map(|name| self.require_index(name)).transpose()?.unwrap_or(0);
        let upper = max.map(|name| self.require_index(name)).transpose()?;
        Ok(self
            .order
            .iter()
            .enumerate()
            .filter(|(index, _)| *index >= lower && upper.is_none_or(|upper| *index <= upper))
            .map(|(_, name)| name.clone())
            .collect())
    }

    /// Renders the endpoint path for a resource by substituting `{param}`
    /// placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the version or endpoint is unknown, a
    /// placeholder has no supplied value, or a value is empty, `.` or `..`.
    /// Values are percent-encoded as single path segments.
    pub fn get_endpoint_url(
        &self,
        version: &str,
        resource: &str,
        params: &UrlParams,
    ) -> Result<String, StoreError> {
        let descriptor = self.get_version_config(version)?;
        let template =
            descriptor.endpoint(resource).ok_or_else(|| StoreError::UnknownEndpoint {
                version: descriptor.name.clone(),
                resource: resource.to_string(),
            })?;
        render_template(template, params).map_err(|err| match err {
            TemplateError::MissingParameter(parameter) => StoreError::MissingParameter {
                version: descriptor.name.clone(),
                resource: resource.to_string(),
                parameter,
            },
            TemplateError::InvalidParameter {
                name,
                value,
            } => StoreError::InvalidParameter {
                version: descriptor.name.clone(),
                resource: resource.to_string(),
                parameter: name,
                value,
            },
            TemplateError::Malformed {
                detail, ..
            } => StoreError::InvalidUrl {
                version: descriptor.name.clone(),
                resource: resource.to_string(),
                detail,
            },
        })
    }

    /// Renders the endpoint and joins it onto the version base URL. Absolute
    /// paths replace the base path; relative paths extend it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when rendering or joining fails.
    pub fn endpoint_absolute_url(
        &self,
        version: &str,
        resource: &str,
        params: &UrlParams,
    ) -> Result<Url, StoreError> {
        let path = self.get_endpoint_url(version, resource, params)?;
        let descriptor = self.get_version_config(version)?;
        let invalid = |detail: String| StoreError::InvalidUrl {
            version: descriptor.name.clone(),
            resource: resource.to_string(),
            detail,
        };
        let mut base = Url::parse(&descriptor.base_url).map_err(|err| invalid(err.to_string()))?;
        if !base.path().ends_with('/') {
            let extended = format!("{}/", base.path());
            base.set_path(&extended);
        }
        base.join(&path).map_err(|err| invalid(err.to_string()))
    }

    /// Returns true when the version's sunset date is on or before `today`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownVersion`] when the version is unknown.
    pub fn is_sunset(&self, version: &str, today: Date) -> Result<bool, StoreError> {
        let descriptor = self.get_version_config(version)?;
        Ok(descriptor.sunset_date.is_some_and(|sunset| sunset <= today))
    }

    /// Returns the URL parameter vocabulary.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeSet<String> {
        &self.parameters
    }

    /// Returns the document-level feature prerequisite map.
    #[must_use]
    pub const fn feature_dependencies(&self) -> &BTreeMap<FeatureName, Vec<FeatureName>> {
        &self.feature_dependencies
    }

    /// Returns every test data template.
    #[must_use]
    pub const fn templates(&self) -> &BTreeMap<ResourceName, TestDataTemplate> {
        &self.templates
    }

    /// Returns the test data template for a resource, if configured.
    #[must_use]
    pub fn template(&self, resource: &str) -> Option<&TestDataTemplate> {
        self.templates.get(resource)
    }

    /// Returns runner settings.
    #[must_use]
    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Returns non-fatal findings recorded at load time.
    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Looks up a version position or fails.
    fn require_index(&self, version: &str) -> Result<usize, StoreError> {
        self.version_index(version).ok_or_else(|| StoreError::UnknownVersion(version.to_string()))
    }

    /// Converts and validates a raw document.
    fn from_raw(raw: RawDocument) -> Result<Self, ConfigError> {
        let versions = raw.versions.ok_or_else(|| {
            ConfigError::Invalid("document must declare a versions mapping".to_string())
        })?;
        let mut descriptors = Vec::with_capacity(versions.len());
        for (key, value) in versions {
            let serde_yaml::Value::String(name) = key else {
                return Err(ConfigError::Invalid("version names must be strings".to_string()));
            };
            let raw_version: RawVersion = serde_yaml::from_value(value)
                .map_err(|err| ConfigError::Parse(format!("version {name}: {err}")))?;
            descriptors.push(descriptor_from_raw(VersionName::new(name), raw_version)?);
        }
        let parameters = match raw.parameters {
            Some(parameters) => {
                if let Some(bad) = parameters.iter().find(|name| !is_parameter_name(name)) {
                    return Err(ConfigError::Invalid(format!(
                        "parameter vocabulary entry {bad} is not a valid placeholder name"
                    )));
                }
                parameters.into_iter().collect()
            }
            None => DEFAULT_PARAMETER_VOCABULARY.iter().map(ToString::to_string).collect(),
        };
        let store = Self::assemble(
            descriptors,
            parameters,
            raw.feature_dependencies,
            BTreeMap::new(),
            raw.runner,
        )?;
        store.with_templates(raw.test_data)
    }

    /// Validates descriptors and settings and builds the store.
    fn assemble(
        descriptors: Vec<VersionDescriptor>,
        parameters: BTreeSet<String>,
        feature_dependencies: BTreeMap<FeatureName, Vec<FeatureName>>,
        templates: BTreeMap<ResourceName, TestDataTemplate>,
        settings: RunnerSettings,
    ) -> Result<Self, ConfigError> {
        if descriptors.is_empty() {
            return Err(ConfigError::Invalid(
                "versions must declare at least one version".to_string(),
            ));
        }
        settings.validate().map_err(ConfigError::Invalid)?;
        let mut warnings = Vec::new();
        let mut versions = BTreeMap::new();
        let mut order = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            validate_descriptor(&descriptor, &parameters, &mut warnings)?;
            let name = descriptor.name.clone();
            if versions.insert(name.clone(), Arc::new(descriptor)).is_some() {
                return Err(ConfigError::Invalid(format!("version {name} is declared twice")));
            }
            order.push(name);
        }
        for warning in &warnings {
            warn!(
                version = %warning.version,
                resource = %warning.resource,
                parameter = %warning.parameter,
                "endpoint template parameter outside vocabulary"
            );
        }
        let store = Self {
            versions,
            order,
            parameters,
            feature_dependencies,
            templates: BTreeMap::new(),
            settings,
            warnings,
        };
        store.with_templates(templates)
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Converts a raw version entry, enforcing required sections.
fn descriptor_from_raw(
    name: VersionName,
    raw: RawVersion,
) -> Result<VersionDescriptor, ConfigError> {
    let missing = |section: &str| {
        ConfigError::Invalid(format!("version {name} is missing required section {section}"))
    };
    let base_url = raw.base_url.ok_or_else(|| missing("base_url"))?;
    let features = raw.features.ok_or_else(|| missing("features"))?;
    let endpoints = raw.endpoints.ok_or_else(|| missing("endpoints"))?;
    let schema_fields = raw.schema_fields.ok_or_else(|| missing("schema_fields"))?;
    let sunset_date = raw.sunset_date.as_deref().map(|text| parse_date(&name, text)).transpose()?;
    Ok(VersionDescriptor {
        name,
        base_url,
        deprecated: raw.deprecated,
        sunset_date,
        features,
        removed_features: raw.removed_features,
        endpoints,
        schema_fields,
        required_fields: raw.required_fields,
        optional_fields: raw.optional_fields,
        default_values: raw.default_values,
    })
}

/// Parses a `YYYY-MM-DD` sunset date.
fn parse_date(version: &VersionName, text: &str) -> Result<Date, ConfigError> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]")).map_err(|err| {
        ConfigError::Invalid(format!("version {version} has invalid sunset_date {text}: {err}"))
    })
}

/// Validates one descriptor and records template warnings.
fn validate_descriptor(
    descriptor: &VersionDescriptor,
    parameters: &BTreeSet<String>,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigError> {
    let name = &descriptor.name;
    if name.as_str().trim().is_empty() {
        return Err(ConfigError::Invalid("version names must be non-empty".to_string()));
    }
    let base = Url::parse(&descriptor.base_url).map_err(|err| {
        ConfigError::Invalid(format!("version {name} has invalid base_url: {err}"))
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "version {name} base_url must use http:// or https://"
        )));
    }
    for (resource, template) in &descriptor.endpoints {
        let placeholders = template_parameters(template)
            .map_err(|err| ConfigError::Invalid(format!("version {name}: {err}")))?;
        for placeholder in placeholders {
            if !parameters.contains(placeholder) {
                warnings.push(ConfigWarning {
                    version: name.clone(),
                    resource: resource.clone(),
                    parameter: placeholder.to_string(),
                });
            }
        }
    }
    let orphan = descriptor
        .required_fields
        .keys()
        .chain(descriptor.optional_fields.keys())
        .chain(descriptor.default_values.keys())
        .find(|key| !descriptor.schema_fields.contains_key(*key));
    if let Some(key) = orphan {
        return Err(ConfigError::SchemaInconsistency {
            version: name.clone(),
            schema_key: key.clone(),
            detail: "field sets declared without a schema_fields entry".to_string(),
        });
    }
    for key in descriptor.schema_fields.keys() {
        descriptor.check_schema(key.as_str()).map_err(|detail| {
            ConfigError::SchemaInconsistency {
                version: name.clone(),
                schema_key: key.clone(),
                detail,
            }
        })?;
    }
    debug!(
        version = %name,
        schemas = descriptor.schema_fields.len(),
        "validated version descriptor"
    );
    Ok(())
}

/// Validates that template overrides only target configured versions.
fn validate_templates(
    templates: &BTreeMap<ResourceName, TestDataTemplate>,
    versions: &BTreeMap<VersionName, Arc<VersionDescriptor>>,
) -> Result<(), ConfigError> {
    for (resource, template) in templates {
        if let Some(version) = template.overrides.keys().find(|name| !versions.contains_key(*name))
        {
            return Err(ConfigError::Invalid(format!(
                "test_data.{resource} overrides unknown version {version}"
            )));
        }
        if let Some((field, _)) =
            template.generators.iter().find(|(_, generator)| generator.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "test_data.{resource}.generators.{field} must name a generator"
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Resolves the config path from the caller, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
