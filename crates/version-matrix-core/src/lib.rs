// crates/version-matrix-core/src/lib.rs
// ============================================================================
// Module: Version Matrix Core Library
// Description: Feature, schema, and test data resolution per API version.
// Purpose: Answer version questions so test bodies never branch on versions.
// Dependencies: version-matrix-config, rand, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! `version-matrix-core` layers three read-only resolvers over a loaded
//! [`version_matrix_config::ConfigurationStore`]:
//!
//! - [`FeatureResolver`] answers feature availability and prerequisite checks.
//! - [`SchemaResolver`] computes [`ResolvedSchema`] field sets and validates
//!   response payloads in strict or lenient mode.
//! - [`TestDataFactory`] builds request payloads from templates, generators,
//!   and schema defaults.
//!
//! Resolvers borrow the store and may be shared across threads.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod factory;
pub mod features;
pub mod generators;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use factory::BuildError;
pub use factory::BuildMode;
pub use factory::TestDataFactory;
pub use features::DependencyCheck;
pub use features::FeatureMatrix;
pub use features::FeaturePolicy;
pub use features::FeatureResolver;
pub use generators::FieldGenerator;
pub use generators::GeneratorRegistry;
pub use schema::ResolveError;
pub use schema::ResolvedSchema;
pub use schema::SchemaResolver;
pub use schema::ValidationResult;
