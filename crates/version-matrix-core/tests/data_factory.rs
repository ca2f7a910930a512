//! Test data factory tests for version-matrix-core.
// crates/version-matrix-core/tests/data_factory.rs
// =============================================================================
// Module: Test Data Factory Tests
// Description: Layering order, required-field checks, modes, and caching.
// Purpose: Ensure payloads are valid for their version before any HTTP call.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::thread;

use serde_json::Value;
use serde_json::json;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::FieldName;
use version_matrix_config::Payload;
use version_matrix_config::ValidationMode;
use version_matrix_core::BuildError;
use version_matrix_core::BuildMode;
use version_matrix_core::GeneratorRegistry;
use version_matrix_core::ResolveError;
use version_matrix_core::SchemaResolver;
use version_matrix_core::TestDataFactory;

use crate::common::clinic_store;
use crate::common::payload;

const PET_ONLY: &str = "\
versions:
  v1:
    base_url: http://localhost:8000
    features: {pet_management: true}
    endpoints:
      pets: /api/v1/pets
    schema_fields:
      pet_create: [name, species, owner_id, breed]
    required_fields:
      pet_create: [name, species, owner_id]
";

fn none() -> Payload {
    Payload::new()
}

// ============================================================================
// SECTION: Required Fields
// ============================================================================

#[test]
fn missing_required_fields_fail_before_any_request() {
    let store = ConfigurationStore::from_yaml_str(PET_ONLY).unwrap();
    let factory = TestDataFactory::new(&store).unwrap();
    let err = factory.build("v1", "pet", "create", &none()).unwrap_err();
    match err {
        BuildError::MissingRequiredField {
            version,
            schema_key,
            fields,
        } => {
            assert_eq!(version.as_str(), "v1");
            assert_eq!(schema_key.as_str(), "pet_create");
            let names: Vec<&str> = fields.iter().map(FieldName::as_str).collect();
            assert_eq!(names, vec!["name", "species", "owner_id"]);
        }
        other => panic!("expected missing required field, got {other:?}"),
    }
}

#[test]
fn template_base_data_satisfies_required_and_omits_optional() {
    let yaml = format!(
        "{PET_ONLY}test_data:\n  pet:\n    base_data:\n      name: Rex\n      species: dog\n      \
         owner_id: 1\n"
    );
    let store = ConfigurationStore::from_yaml_str(&yaml).unwrap();
    let factory = TestDataFactory::new(&store).unwrap();
    let built = factory.build("v1", "pet", "create", &none()).unwrap();
    assert_eq!(built, payload(json!({"name": "Rex", "species": "dog", "owner_id": 1})));
    assert!(!built.contains_key("breed"));
}

#[test]
fn caller_overrides_can_satisfy_required_fields() {
    let store = ConfigurationStore::from_yaml_str(PET_ONLY).unwrap();
    let factory = TestDataFactory::new(&store).unwrap();
    let overrides = payload(json!({"name": "Rex", "species": "cat", "owner_id": 3, "breed": null}));
    let built = factory.build("v1", "pet", "create", &overrides).unwrap();
    assert_eq!(built, overrides);
}

// ============================================================================
// SECTION: Layering
// ============================================================================

#[test]
fn clinic_template_layers_generators_and_version_overrides() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();

    let v1 = factory.build("v1", "pet", "create", &none()).unwrap();
    assert_eq!(v1["species"], json!("dog"));
    assert_eq!(v1["owner_id"], json!(1));
    assert!(v1["name"].as_str().unwrap().starts_with("name-"));
    assert!(!v1.contains_key("microchip_id"));

    let v2 = factory.build("v2", "pet", "create", &none()).unwrap();
    assert_eq!(v2["microchip_id"], json!("985112000000001"));
    assert!(!v2.contains_key("temperament"));
}

#[test]
fn caller_overrides_always_win() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let overrides = payload(json!({"name": "X", "species": "cat"}));
    for version in ["v1", "v2"] {
        let built = factory.build(version, "pet", "create", &overrides).unwrap();
        assert_eq!(built["name"], json!("X"));
        assert_eq!(built["species"], json!("cat"));
    }
}

#[test]
fn schema_defaults_fill_unset_required_fields() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let built = factory.build("v2", "appointment", "create", &none()).unwrap();
    assert_eq!(built["priority"], json!("normal"));
    assert_eq!(built["reason"], json!("checkup"));

    let urgent = payload(json!({"priority": "urgent"}));
    let built = factory.build("v2", "appointment", "create", &urgent).unwrap();
    assert_eq!(built["priority"], json!("urgent"));
}

#[test]
fn repeated_builds_differ_only_in_generated_fields() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let mut first = factory.build("v2", "pet", "create", &none()).unwrap();
    let mut second = factory.build("v2", "pet", "create", &none()).unwrap();
    let first_name = first.remove("name").unwrap();
    let second_name = second.remove("name").unwrap();
    assert_ne!(first_name, second_name);
    assert_eq!(first, second);
}

#[test]
fn builds_never_mutate_templates() {
    let store = clinic_store();
    let before = store.template("pet").cloned();
    let factory = TestDataFactory::new(&store).unwrap();
    let mut built = factory.build("v2", "pet", "create", &payload(json!({"owner_id": 9}))).unwrap();
    built.insert("species".to_string(), json!("parrot"));
    assert_eq!(store.template("pet").cloned(), before);
}

// ============================================================================
// SECTION: Modes
// ============================================================================

#[test]
fn schema_mode_drops_undeclared_fields() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let overrides = payload(json!({"microchip_id": "123"}));
    let built = factory.build("v1", "pet", "create", &overrides).unwrap();
    assert!(!built.contains_key("microchip_id"));
}

#[test]
fn passthrough_mode_keeps_undeclared_fields() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let overrides = payload(json!({"microchip_id": "123"}));
    let built = factory
        .build_with_mode("v1", "pet", "create", &overrides, BuildMode::Passthrough)
        .unwrap();
    assert_eq!(built["microchip_id"], json!("123"));
}

#[test]
fn built_payloads_validate_strictly_against_their_schema() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let resolver = SchemaResolver::new(&store);
    for version in store.get_supported_versions() {
        for resource in store.templates().keys() {
            let key = format!("{resource}_create");
            if resolver.resolve(version.as_str(), &key).is_err() {
                continue;
            }
            let built = factory.build(version.as_str(), resource.as_str(), "create", &none());
            let result = resolver
                .validate_response(&built.unwrap(), version.as_str(), &key, ValidationMode::Strict)
                .unwrap();
            assert!(result.is_ok(), "{}", result.summary());
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

#[test]
fn unknown_schema_is_propagated() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let err = factory.build("v1", "health_record", "create", &none()).unwrap_err();
    assert!(matches!(err, BuildError::Resolve(ResolveError::UnknownSchema { .. })));
}

#[test]
fn unknown_generator_is_rejected_at_construction() {
    let yaml = format!(
        "{PET_ONLY}test_data:\n  pet:\n    generators:\n      name: uuid4\n"
    );
    let store = ConfigurationStore::from_yaml_str(&yaml).unwrap();
    let err = TestDataFactory::new(&store).unwrap_err();
    assert!(matches!(err, BuildError::UnknownGenerator { ref generator, .. } if generator == "uuid4"));
}

#[test]
fn custom_generators_can_be_registered() {
    let yaml = format!(
        "{PET_ONLY}test_data:\n  pet:\n    base_data:\n      species: dog\n      owner_id: 1\n    \
         generators:\n      name: pet_name\n"
    );
    let store = ConfigurationStore::from_yaml_str(&yaml).unwrap();
    let registry =
        GeneratorRegistry::builtin().with("pet_name", |_: &FieldName| Value::from("Biscuit"));
    let factory = TestDataFactory::with_generators(&store, registry).unwrap();
    let built = factory.build("v1", "pet", "create", &none()).unwrap();
    assert_eq!(built["name"], json!("Biscuit"));
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_first_access_shares_one_cache_entry() {
    let store = clinic_store();
    let factory = TestDataFactory::new(&store).unwrap();
    let schemas: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0 .. 8)
            .map(|_| {
                scope.spawn(|| {
                    factory.build("v2", "pet", "create", &none()).unwrap();
                    factory.schema("v2", "pet_create").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });
    let first = factory.schema("v2", "pet_create").unwrap();
    assert!(schemas.iter().all(|schema| Arc::ptr_eq(schema, &first)));
}
