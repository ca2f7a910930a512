// crates/version-matrix-runner/tests/common/mod.rs
// =============================================================================
// Module: Runner Test Helpers
// Description: Clinic fixture and an in-memory API client spy.
// Purpose: Exercise orchestration without a live API.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::Value;
use serde_json::json;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::Payload;
use version_matrix_runner::ApiClient;
use version_matrix_runner::ApiRequest;
use version_matrix_runner::ApiResponse;
use version_matrix_runner::HttpMethod;
use version_matrix_runner::TransportError;

/// Canonical clinic API configuration shipped at the default location.
pub const CLINIC_CONFIG: &str = include_str!("../../../../tests/config/api_versions.yaml");

/// Loads the canonical clinic configuration.
pub fn clinic_store() -> ConfigurationStore {
    match ConfigurationStore::from_yaml_str(CLINIC_CONFIG) {
        Ok(store) => store,
        Err(err) => panic!("clinic config failed to load: {err}"),
    }
}

/// Converts a JSON object literal into a payload.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}

/// Scripted response handler.
type Handler =
    Box<dyn Fn(&ApiRequest) -> Option<Result<ApiResponse, TransportError>> + Send + Sync>;

/// In-memory client that records every request.
///
/// By default POST echoes the body with a fresh `id` and status 201, DELETE
/// answers 204, and every other method answers 200 with an empty object.
pub struct FakeClient {
    requests: Mutex<Vec<ApiRequest>>,
    next_id: AtomicU64,
    handler: Option<Handler>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            handler: None,
        }
    }

    /// Overrides the default behavior for requests the handler answers;
    /// returning `None` falls back to the default.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Option<Result<ApiResponse, TransportError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::new()
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    /// Returns the URLs of DELETE requests in send order.
    pub fn deletes(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == HttpMethod::Delete)
            .map(|request| request.url.to_string())
            .collect()
    }

    fn default_response(&self, request: &ApiRequest) -> ApiResponse {
        match request.method {
            HttpMethod::Post => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let mut body = request.body.clone().unwrap_or_default();
                body.insert("id".to_string(), json!(id));
                ApiResponse::new(201, Value::Object(body))
            }
            HttpMethod::Delete => ApiResponse::new(204, Value::Null),
            HttpMethod::Get | HttpMethod::Put | HttpMethod::Patch => {
                ApiResponse::new(200, json!({}))
            }
        }
    }
}

impl ApiClient for FakeClient {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match self.handler.as_ref().and_then(|handler| handler(request)) {
            Some(result) => result,
            None => Ok(self.default_response(request)),
        }
    }
}
