// crates/version-matrix-config/src/lib.rs
// ============================================================================
// Module: Version Matrix Config Library
// Description: Version configuration model, loading, validation, and linting.
// Purpose: Single source of truth for per-version API differences.
// Dependencies: serde, serde_json, serde_yaml, time, tracing, url
// ============================================================================

//! ## Overview
//! `version-matrix-config` loads the declarative description of every API
//! version under test (base URLs, feature flags, endpoint templates, schema
//! field lists, defaults, and test data templates). Loading is strict and
//! fail-closed; the resulting [`ConfigurationStore`] is immutable and safe to
//! share across threads.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod lint;
pub mod model;
pub mod store;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::FeatureName;
pub use identifiers::FieldName;
pub use identifiers::ResourceName;
pub use identifiers::SchemaKey;
pub use identifiers::VersionName;
pub use lint::LintFinding;
pub use lint::LintKind;
pub use lint::lint;
pub use model::Payload;
pub use model::RunnerSettings;
pub use model::TestDataTemplate;
pub use model::ValidationMode;
pub use model::VersionDescriptor;
pub use model::check_schema_consistency;
pub use store::CONFIG_ENV_VAR;
pub use store::ConfigError;
pub use store::ConfigWarning;
pub use store::ConfigurationStore;
pub use store::DEFAULT_CONFIG_PATH;
pub use store::DEFAULT_PARAMETER_VOCABULARY;
pub use store::DocumentFormat;
pub use store::StoreError;
pub use template::TemplateError;
pub use template::UrlParams;
pub use template::render_template;
pub use template::template_parameters;
