// crates/version-matrix-runner/src/session.rs
// ============================================================================
// Module: Test Session
// Description: Session-scoped configuration shared by every versioned test.
// Purpose: Load configuration once and hand out clients and orchestrators.
// Dependencies: version-matrix-config, version-matrix-core, tracing
// ============================================================================

//! ## Overview
//! A [`Session`] owns the loaded [`ConfigurationStore`]. Test binaries either
//! construct one explicitly or share the process-wide instance returned by
//! [`Session::global`], which loads configuration on first use only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::OnceLock;

use tracing::info;
use version_matrix_config::ConfigError;
use version_matrix_config::ConfigurationStore;
use version_matrix_core::BuildError;

use crate::client::ApiClient;
use crate::client::TransportError;
use crate::http::HttpApiClient;
use crate::orchestrator::VersionedTestOrchestrator;

// ============================================================================
// SECTION: Session
// ============================================================================

/// Process-wide session instance.
static GLOBAL_SESSION: OnceLock<Session> = OnceLock::new();

/// Loaded configuration shared by a test session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Immutable configuration.
    store: ConfigurationStore,
}

impl Session {
    /// Loads configuration using the standard path resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self::from_store(ConfigurationStore::load(path)?))
    }

    /// Wraps an already loaded store.
    #[must_use]
    pub const fn from_store(store: ConfigurationStore) -> Self {
        Self {
            store,
        }
    }

    /// Returns the process-wide session, loading it on first call.
    ///
    /// `path` only matters for the first successful call. A failed load is
    /// not cached, so a later call may retry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the first load fails.
    pub fn global(path: Option<&Path>) -> Result<&'static Self, ConfigError> {
        if let Some(session) = GLOBAL_SESSION.get() {
            return Ok(session);
        }
        let loaded = Self::load(path)?;
        let session = GLOBAL_SESSION.get_or_init(|| loaded);
        info!(versions = session.store.get_supported_versions().len(), "test session ready");
        Ok(session)
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub const fn store(&self) -> &ConfigurationStore {
        &self.store
    }

    /// Builds an HTTP client from the runner settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the client cannot be created.
    pub fn http_client(&self) -> Result<HttpApiClient, TransportError> {
        HttpApiClient::new(self.store.settings())
    }

    /// Creates an orchestrator bound to this session and `client`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the data templates are invalid.
    pub fn orchestrator<'a>(
        &'a self,
        client: &'a dyn ApiClient,
    ) -> Result<VersionedTestOrchestrator<'a>, BuildError> {
        VersionedTestOrchestrator::new(&self.store, client)
    }
}
