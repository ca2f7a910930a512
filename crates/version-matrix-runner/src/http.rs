// crates/version-matrix-runner/src/http.rs
// ============================================================================
// Module: HTTP API Client
// Description: Blocking reqwest client for the API under test.
// Purpose: Issue bounded JSON requests with timeouts and size limits.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpApiClient`] sends JSON requests with a per-request timeout, a fixed
//! user agent, and redirects disabled. Response bodies are read up to
//! `max_response_bytes`; larger bodies fail the request. Empty bodies become
//! `Null` and non-JSON bodies are kept as a string so error pages stay
//! inspectable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde_json::Value;
use tracing::debug;
use version_matrix_config::RunnerSettings;

use crate::client::ApiClient;
use crate::client::ApiRequest;
use crate::client::ApiResponse;
use crate::client::HttpMethod;
use crate::client::TransportError;

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking HTTP client.
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle.
/// - Redirects are not followed.
/// - Responses larger than `max_response_bytes` fail closed.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    /// Underlying reqwest client.
    client: Client,
    /// Request timeout in milliseconds.
    timeout_ms: u64,
    /// Maximum accepted body size.
    max_response_bytes: usize,
}

impl HttpApiClient {
    /// Builds a client from runner settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the client cannot be created.
    pub fn new(settings: &RunnerSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(settings.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Ok(Self {
            client,
            timeout_ms: settings.timeout_ms,
            max_response_bytes: settings.max_response_bytes,
        })
    }

    /// Maps a reqwest error onto the transport taxonomy.
    fn classify(&self, request: &ApiRequest, err: &reqwest::Error) -> TransportError {
        let method = request.method;
        let url = request.url.to_string();
        if err.is_timeout() {
            TransportError::Timeout {
                method,
                url,
                timeout_ms: self.timeout_ms,
            }
        } else if err.is_connect() {
            TransportError::Connect {
                method,
                url,
                detail: err.to_string(),
            }
        } else {
            TransportError::Request {
                method,
                url,
                detail: err.to_string(),
            }
        }
    }
}

impl ApiClient for HttpApiClient {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self.client.request(reqwest_method(request.method), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|err| TransportError::Request {
                method: request.method,
                url: request.url.to_string(),
                detail: format!("body serialization failed: {err}"),
            })?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }
        let mut response = builder.send().map_err(|err| self.classify(request, &err))?;
        let status = response.status().as_u16();
        let bytes = read_response_limited(&mut response, self.max_response_bytes, request)?;
        debug!(
            method = %request.method,
            url = %request.url,
            status,
            bytes = bytes.len(),
            "api response received"
        );
        Ok(ApiResponse::new(status, parse_body(&bytes)))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a runner method into a reqwest method.
fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Parses a body as JSON, falling back to a string.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
    request: &ApiRequest,
) -> Result<Vec<u8>, TransportError> {
    let too_large = || TransportError::ResponseTooLarge {
        method: request.method,
        url: request.url.to_string(),
        limit: max_bytes,
    };
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| too_large())?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(too_large());
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle.read_to_end(&mut buf).map_err(|err| TransportError::Request {
        method: request.method,
        url: request.url.to_string(),
        detail: format!("failed to read response: {err}"),
    })?;
    if buf.len() > max_bytes {
        return Err(too_large());
    }
    Ok(buf)
}
