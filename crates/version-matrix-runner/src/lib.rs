// crates/version-matrix-runner/src/lib.rs
// ============================================================================
// Module: Version Matrix Runner Library
// Description: Versioned test orchestration over a configured API.
// Purpose: Run one logical test against every applicable API version.
// Dependencies: version-matrix-config, version-matrix-core, reqwest, tracing
// ============================================================================

//! ## Overview
//! `version-matrix-runner` turns a [`VersionedTest`] into one case per
//! configured API version, skips cases whose version lacks a required
//! feature (or fails another declared condition), and runs the remaining
//! cases with an isolated [`TestExecutionContext`]. Every case cleans up the
//! resources it created, whether its body passed, failed, or panicked.
//!
//! Requests go through the [`ApiClient`] trait; [`HttpApiClient`] is the
//! blocking HTTP implementation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assertions;
pub mod client;
pub mod context;
pub mod http;
pub mod orchestrator;
pub mod report;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertions::assert_error_response;
pub use assertions::assert_status;
pub use assertions::validate_response_structure;
pub use client::ApiClient;
pub use client::ApiRequest;
pub use client::ApiResponse;
pub use client::HttpMethod;
pub use client::TransportError;
pub use context::CleanupFailure;
pub use context::TestExecutionContext;
pub use http::HttpApiClient;
pub use orchestrator::CaseDecision;
pub use orchestrator::CaseFailure;
pub use orchestrator::CaseOutcome;
pub use orchestrator::CaseResult;
pub use orchestrator::ExpandedCase;
pub use orchestrator::OrchestratorError;
pub use orchestrator::ReportError;
pub use orchestrator::TestBody;
pub use orchestrator::TestReport;
pub use orchestrator::TestRequirements;
pub use orchestrator::VersionPredicate;
pub use orchestrator::VersionedTest;
pub use orchestrator::VersionedTestOrchestrator;
pub use report::JsonLinesSkipSink;
pub use report::SkipCount;
pub use report::SkipLedger;
pub use report::SkipRecord;
pub use report::SkipSink;
pub use session::Session;
