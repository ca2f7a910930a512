// crates/version-matrix-runner/src/assertions.rs
// ============================================================================
// Module: Assertion Helpers
// Description: Status, error-body, and schema assertions for test bodies.
// Purpose: Turn response checks into case failures with readable messages.
// Dependencies: version-matrix-core, serde_json
// ============================================================================

//! Assertion helpers return [`CaseFailure`] instead of panicking so a failed
//! check still lets the case run its cleanup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use version_matrix_config::ValidationMode;
use version_matrix_core::SchemaResolver;
use version_matrix_core::ValidationResult;

use crate::client::ApiResponse;
use crate::orchestrator::CaseFailure;

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Fails unless the response has the expected status.
///
/// # Errors
///
/// Returns [`CaseFailure::UnexpectedStatus`] on mismatch.
pub fn assert_status(response: &ApiResponse, expected: u16) -> Result<(), CaseFailure> {
    if response.status == expected {
        return Ok(());
    }
    Err(CaseFailure::UnexpectedStatus {
        expected,
        actual: response.status,
        body: response.body.to_string(),
    })
}

/// Fails unless the response has the expected status and an error body with
/// a `detail` field.
///
/// # Errors
///
/// Returns [`CaseFailure`] when the status differs or the body has no
/// `detail` field.
pub fn assert_error_response(response: &ApiResponse, expected: u16) -> Result<(), CaseFailure> {
    assert_status(response, expected)?;
    match response.object().and_then(|body| body.get("detail")) {
        Some(Value::Null) | None => Err(CaseFailure::Assertion(format!(
            "error response with status {expected} has no detail field: {}",
            response.body
        ))),
        Some(_) => Ok(()),
    }
}

/// Validates a response body against a schema.
///
/// # Errors
///
/// Returns [`CaseFailure::Assertion`] when the body is not a JSON object,
/// [`CaseFailure::Resolve`] when the schema is unknown, and
/// [`CaseFailure::Validation`] when the body violates the schema.
pub fn validate_response_structure(
    resolver: &SchemaResolver<'_>,
    body: &Value,
    version: &str,
    schema_key: &str,
    mode: ValidationMode,
) -> Result<ValidationResult, CaseFailure> {
    let Some(payload) = body.as_object() else {
        return Err(CaseFailure::Assertion(format!(
            "response for {schema_key} in version {version} is not a JSON object: {body}"
        )));
    };
    let result = resolver.validate_response(payload, version, schema_key, mode)?;
    if result.is_ok() { Ok(result) } else { Err(CaseFailure::Validation(result)) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
