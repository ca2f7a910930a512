// crates/version-matrix-runner/src/context.rs
// ============================================================================
// Module: Test Execution Context
// Description: Per-case handle for data building, requests, and cleanup.
// Purpose: Give each expanded case exclusive state and guaranteed cleanup.
// Dependencies: version-matrix-config, version-matrix-core, tracing, url
// ============================================================================

//! ## Overview
//! A [`TestExecutionContext`] is owned by exactly one expanded case. It knows
//! its version, builds payloads through the shared factory, and records every
//! resource the case creates. [`TestExecutionContext::cleanup`] deletes those
//! resources in reverse creation order; dropping a context with pending
//! cleanup runs it as a best-effort backstop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;
use url::Url;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::Payload;
use version_matrix_config::UrlParams;
use version_matrix_config::ValidationMode;
use version_matrix_config::VersionDescriptor;
use version_matrix_config::VersionName;
use version_matrix_core::BuildMode;
use version_matrix_core::FeatureResolver;
use version_matrix_core::SchemaResolver;
use version_matrix_core::TestDataFactory;
use version_matrix_core::ValidationResult;

use crate::assertions::validate_response_structure;
use crate::client::ApiClient;
use crate::client::ApiRequest;
use crate::client::ApiResponse;
use crate::client::HttpMethod;
use crate::orchestrator::CaseFailure;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Failed cleanup of one tracked resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    /// Resource URL the DELETE targeted.
    pub url: String,
    /// Failure description.
    pub detail: String,
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Exclusive per-case execution state.
pub struct TestExecutionContext<'a> {
    /// Version this case runs against.
    descriptor: Arc<VersionDescriptor>,
    /// Loaded configuration.
    store: &'a ConfigurationStore,
    /// Feature resolver shared by the run.
    features: FeatureResolver<'a>,
    /// Shared payload factory.
    factory: &'a TestDataFactory<'a>,
    /// API transport.
    client: &'a dyn ApiClient,
    /// Validation mode for response checks.
    mode: ValidationMode,
    /// Created resources awaiting cleanup, in creation order.
    created: Vec<Url>,
}

impl<'a> TestExecutionContext<'a> {
    /// Creates a context for one version.
    #[must_use]
    pub fn new(
        descriptor: Arc<VersionDescriptor>,
        features: FeatureResolver<'a>,
        factory: &'a TestDataFactory<'a>,
        client: &'a dyn ApiClient,
    ) -> Self {
        let store = factory.store();
        Self {
            descriptor,
            store,
            features,
            factory,
            client,
            mode: store.settings().validation_mode,
            created: Vec::new(),
        }
    }

    /// Overrides the response validation mode.
    #[must_use]
    pub fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the version name.
    #[must_use]
    pub fn version(&self) -> &VersionName {
        &self.descriptor.name
    }

    /// Returns the version descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &VersionDescriptor {
        &self.descriptor
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub const fn store(&self) -> &'a ConfigurationStore {
        self.store
    }

    /// Returns the validation mode in effect.
    #[must_use]
    pub const fn validation_mode(&self) -> ValidationMode {
        self.mode
    }

    /// Returns whether a feature is available in this version.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.is_available(self.version().as_str(), feature)
    }

    /// Returns a schema resolver over the loaded configuration.
    #[must_use]
    pub const fn schemas(&self) -> SchemaResolver<'a> {
        SchemaResolver::new(self.store)
    }

    /// Builds a payload for `{resource}_{operation}` in this version.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure::Build`] when the payload cannot be built.
    pub fn build(
        &self,
        resource: &str,
        operation: &str,
        overrides: &Payload,
    ) -> Result<Payload, CaseFailure> {
        Ok(self.factory.build(self.version().as_str(), resource, operation, overrides)?)
    }

    /// Builds a payload that keeps fields outside the schema.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure::Build`] when the payload cannot be built.
    pub fn build_passthrough(
        &self,
        resource: &str,
        operation: &str,
        overrides: &Payload,
    ) -> Result<Payload, CaseFailure> {
        Ok(self.factory.build_with_mode(
            self.version().as_str(),
            resource,
            operation,
            overrides,
            BuildMode::Passthrough,
        )?)
    }

    /// Returns the absolute URL of an endpoint in this version.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure::Store`] when the endpoint is unknown or a
    /// template parameter is missing.
    pub fn url(&self, endpoint: &str, params: &UrlParams) -> Result<Url, CaseFailure> {
        Ok(self.store.endpoint_absolute_url(self.version().as_str(), endpoint, params)?)
    }

    /// Sends a request through the client.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure::Transport`] when the request fails.
    pub fn send(&self, request: &ApiRequest) -> Result<ApiResponse, CaseFailure> {
        debug!(
            version = %self.version(),
            method = %request.method,
            url = %request.url,
            "sending api request"
        );
        Ok(self.client.send(request)?)
    }

    /// Sends a request to an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure`] when the URL cannot be built or the request fails.
    pub fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &UrlParams,
        body: Option<Payload>,
    ) -> Result<ApiResponse, CaseFailure> {
        let mut request = ApiRequest::new(method, self.url(endpoint, params)?);
        request.body = body;
        self.send(&request)
    }

    /// Sends a GET to an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure`] when the URL cannot be built or the request fails.
    pub fn get(&self, endpoint: &str, params: &UrlParams) -> Result<ApiResponse, CaseFailure> {
        self.request(HttpMethod::Get, endpoint, params, None)
    }

    /// Builds a `{resource}_create` payload, POSTs it to `endpoint`, and
    /// tracks the created resource for cleanup.
    ///
    /// A created resource is tracked when the response is 2xx and its body
    /// carries an `id`; the cleanup URL is the endpoint URL plus that id.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure`] when building, URL rendering, or the request
    /// fails.
    pub fn create(
        &mut self,
        endpoint: &str,
        resource: &str,
        params: &UrlParams,
        overrides: &Payload,
    ) -> Result<ApiResponse, CaseFailure> {
        let payload = self.build(resource, "create", overrides)?;
        let url = self.url(endpoint, params)?;
        let response = self.send(&ApiRequest::post(url.clone(), payload))?;
        if response.is_success()
            && let Some(id) = response.object().and_then(|body| body.get("id"))
        {
            self.track_cleanup(resource_url(&url, id)?);
        }
        Ok(response)
    }

    /// Records a resource URL to DELETE during cleanup.
    pub fn track_cleanup(&mut self, url: Url) {
        debug!(version = %self.version(), url = %url, "tracking resource for cleanup");
        self.created.push(url);
    }

    /// Returns resources awaiting cleanup, in creation order.
    #[must_use]
    pub fn pending_cleanup(&self) -> &[Url] {
        &self.created
    }

    /// Validates a response body against a schema in this version.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure`] when the body is not an object, the schema
    /// cannot be resolved, or the body violates the schema.
    pub fn validate_response(
        &self,
        response: &ApiResponse,
        schema_key: &str,
    ) -> Result<ValidationResult, CaseFailure> {
        validate_response_structure(
            &self.schemas(),
            &response.body,
            self.version().as_str(),
            schema_key,
            self.mode,
        )
    }

    /// Deletes tracked resources in reverse creation order.
    ///
    /// Every tracked resource is attempted; failures are collected rather than
    /// raised. A 404 counts as already cleaned up.
    pub fn cleanup(&mut self) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();
        while let Some(url) = self.created.pop() {
            let detail = match self.client.send(&ApiRequest::delete(url.clone())) {
                Ok(response) if response.is_success() || response.status == 404 => None,
                Ok(response) => Some(format!("DELETE returned status {}", response.status)),
                Err(err) => Some(err.to_string()),
            };
            match detail {
                None => debug!(version = %self.descriptor.name, url = %url, "resource cleaned up"),
                Some(detail) => {
                    warn!(
                        version = %self.descriptor.name,
                        url = %url,
                        detail = %detail,
                        "resource cleanup failed"
                    );
                    failures.push(CleanupFailure {
                        url: url.to_string(),
                        detail,
                    });
                }
            }
        }
        failures
    }
}

impl Drop for TestExecutionContext<'_> {
    fn drop(&mut self) {
        if !self.created.is_empty() {
            warn!(
                version = %self.descriptor.name,
                pending = self.created.len(),
                "context dropped with pending cleanup"
            );
            let _ = self.cleanup();
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends a created resource id to its collection URL.
fn resource_url(collection: &Url, id: &Value) -> Result<Url, CaseFailure> {
    let id = match id {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        other => {
            return Err(CaseFailure::Assertion(format!(
                "created resource id must be a string or number, got {other}"
            )));
        }
    };
    let mut url = collection.clone();
    url.path_segments_mut()
        .map_err(|()| CaseFailure::Assertion(format!("{collection} cannot be a base URL")))?
        .pop_if_empty()
        .push(&id);
    Ok(url)
}
