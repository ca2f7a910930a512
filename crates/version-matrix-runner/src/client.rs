// crates/version-matrix-runner/src/client.rs
// ============================================================================
// Module: API Client Interface
// Description: Transport-agnostic request/response types for the API under test.
// Purpose: Let tests swap the real HTTP client for in-memory fakes.
// Dependencies: serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! The runner talks to the API under test only through [`ApiClient`]. Request
//! and response bodies are opaque JSON values; the runner knows field names
//! from configuration and nothing about business semantics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;
use url::Url;
use version_matrix_config::Payload;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// HTTP method used by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the canonical upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request sent to the API under test.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: Url,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// JSON object body, if any.
    pub body: Option<Payload>,
}

impl ApiRequest {
    /// Creates a request without a body.
    #[must_use]
    pub const fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub const fn delete(url: Url) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(url: Url, body: Payload) -> Self {
        Self::new(HttpMethod::Post, url).with_body(body)
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Payload) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Response returned by the API under test.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body; `Null` when empty, a string when not valid JSON.
    pub body: Value,
}

impl ApiResponse {
    /// Creates a response.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body as a JSON object, if it is one.
    #[must_use]
    pub fn object(&self) -> Option<&Payload> {
        self.body.as_object()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport failures. Each fails only the case that issued the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request exceeded the configured timeout.
    #[error("{method} {url} timed out after {timeout_ms} ms")]
    Timeout {
        /// Method used.
        method: HttpMethod,
        /// Target URL.
        url: String,
        /// Configured timeout.
        timeout_ms: u64,
    },
    /// Connection could not be established.
    #[error("{method} {url} could not connect: {detail}")]
    Connect {
        /// Method used.
        method: HttpMethod,
        /// Target URL.
        url: String,
        /// Underlying error.
        detail: String,
    },
    /// Response body exceeded the configured limit.
    #[error("{method} {url} response exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Method used.
        method: HttpMethod,
        /// Target URL.
        url: String,
        /// Configured limit.
        limit: usize,
    },
    /// Any other request failure.
    #[error("{method} {url} failed: {detail}")]
    Request {
        /// Method used.
        method: HttpMethod,
        /// Target URL.
        url: String,
        /// Underlying error.
        detail: String,
    },
    /// Client could not be constructed.
    #[error("http client build failed: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Sends requests to the API under test.
pub trait ApiClient: Send + Sync {
    /// Sends one request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be completed.
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

impl<T: ApiClient + ?Sized> ApiClient for &T {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).send(request)
    }
}
