// crates/version-matrix-runner/src/orchestrator.rs
// ============================================================================
// Module: Versioned Test Orchestrator
// Description: Expansion of logical tests into per-version cases and execution.
// Purpose: Run one test body against every applicable API version in isolation.
// Dependencies: version-matrix-config, version-matrix-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! A [`VersionedTest`] is declared once and expanded into one case per
//! configured version (or a restricted subset). Each case is decided before
//! its body runs:
//!
//! - Deprecated versions are skipped when deprecated versions are excluded.
//! - Versions outside the declared minimum/maximum are skipped.
//! - Versions missing a required feature, or one of its prerequisites, are
//!   skipped.
//! - Versions failing a custom condition are skipped.
//!
//! Executed cases own a fresh [`TestExecutionContext`]. Body failures and
//! panics are isolated per case and cleanup runs on every exit path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread;

use thiserror::Error;
use tracing::info;
use tracing::warn;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::FeatureName;
use version_matrix_config::StoreError;
use version_matrix_config::VersionDescriptor;
use version_matrix_config::VersionName;
use version_matrix_core::BuildError;
use version_matrix_core::FeaturePolicy;
use version_matrix_core::FeatureResolver;
use version_matrix_core::ResolveError;
use version_matrix_core::TestDataFactory;
use version_matrix_core::ValidationResult;

use crate::client::ApiClient;
use crate::client::TransportError;
use crate::context::CleanupFailure;
use crate::context::TestExecutionContext;
use crate::report::SkipLedger;
use crate::report::SkipRecord;
use crate::report::SkipSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure of one executed case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseFailure {
    /// Caller assertion failed.
    #[error("assertion failed: {0}")]
    Assertion(String),
    /// Response status differed from the expected status.
    #[error("expected status {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        /// Expected status.
        expected: u16,
        /// Actual status.
        actual: u16,
        /// Response body as text.
        body: String,
    },
    /// Response body violated the resolved schema.
    #[error("response did not match schema: {}", .0.summary())]
    Validation(ValidationResult),
    /// Request could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Payload could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Schema could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Endpoint could not be rendered.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Test body panicked.
    #[error("test body panicked: {0}")]
    Panicked(String),
}

/// Errors raised while expanding a test declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Declaration names a version the configuration does not define.
    #[error("test {test} references unknown version {version}")]
    UnknownVersion {
        /// Logical test name.
        test: String,
        /// Unknown version.
        version: String,
    },
    /// Minimum version is later than the maximum version.
    #[error("test {test} has min_version {min} after max_version {max}")]
    InvertedRange {
        /// Logical test name.
        test: String,
        /// Declared minimum.
        min: VersionName,
        /// Declared maximum.
        max: VersionName,
    },
}

// ============================================================================
// SECTION: Test Declarations
// ============================================================================

/// Test body executed once per applicable version.
pub type TestBody =
    dyn Fn(&mut TestExecutionContext<'_>) -> Result<(), CaseFailure> + Send + Sync;

/// Version predicate; returning false skips the case.
pub type VersionPredicate = dyn Fn(&VersionDescriptor) -> bool + Send + Sync;

/// Custom run condition with the reason reported when it fails.
struct Condition {
    /// Skip reason.
    reason: String,
    /// Predicate that must hold for the case to run.
    predicate: Box<VersionPredicate>,
}

/// Applicability requirements of a logical test.
#[derive(Default)]
pub struct TestRequirements {
    /// Features every applicable version must provide.
    pub features: Vec<FeatureName>,
    /// Prerequisite map; the configuration's map is used when absent.
    pub dependencies: Option<BTreeMap<FeatureName, Vec<FeatureName>>>,
    /// Earliest applicable version, inclusive.
    pub min_version: Option<VersionName>,
    /// Latest applicable version, inclusive.
    pub max_version: Option<VersionName>,
    /// Restricts expansion to these versions.
    pub versions: Option<Vec<VersionName>>,
    /// Overrides the session default for deprecated versions.
    pub include_deprecated: Option<bool>,
    /// Custom run conditions.
    conditions: Vec<Condition>,
}

impl fmt::Debug for TestRequirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRequirements")
            .field("features", &self.features)
            .field("dependencies", &self.dependencies)
            .field("min_version", &self.min_version)
            .field("max_version", &self.max_version)
            .field("versions", &self.versions)
            .field("include_deprecated", &self.include_deprecated)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

/// Logical test declared once and expanded per version.
pub struct VersionedTest {
    /// Logical test name.
    name: String,
    /// Applicability requirements.
    requirements: TestRequirements,
    /// Body run for each executed case.
    body: Box<TestBody>,
}

impl VersionedTest {
    /// Declares a test.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestExecutionContext<'_>) -> Result<(), CaseFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            requirements: TestRequirements::default(),
            body: Box::new(body),
        }
    }

    /// Returns the test name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared requirements.
    #[must_use]
    pub const fn requirements(&self) -> &TestRequirements {
        &self.requirements
    }

    /// Requires a feature.
    #[must_use]
    pub fn requires(mut self, feature: impl Into<FeatureName>) -> Self {
        self.requirements.features.push(feature.into());
        self
    }

    /// Supplies a prerequisite map for this test.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: BTreeMap<FeatureName, Vec<FeatureName>>) -> Self {
        self.requirements.dependencies = Some(dependencies);
        self
    }

    /// Sets the earliest applicable version.
    #[must_use]
    pub fn min_version(mut self, version: impl Into<VersionName>) -> Self {
        self.requirements.min_version = Some(version.into());
        self
    }

    /// Sets the latest applicable version.
    #[must_use]
    pub fn max_version(mut self, version: impl Into<VersionName>) -> Self {
        self.requirements.max_version = Some(version.into());
        self
    }

    /// Restricts expansion to the given versions.
    #[must_use]
    pub fn only_versions<I, V>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VersionName>,
    {
        self.requirements.versions = Some(versions.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides whether deprecated versions run.
    #[must_use]
    pub const fn include_deprecated(mut self, include: bool) -> Self {
        self.requirements.include_deprecated = Some(include);
        self
    }

    /// Adds a run condition; the case is skipped with `reason` when
    /// `predicate` returns false.
    #[must_use]
    pub fn run_if<P>(mut self, reason: impl Into<String>, predicate: P) -> Self
    where
        P: Fn(&VersionDescriptor) -> bool + Send + Sync + 'static,
    {
        self.requirements.conditions.push(Condition {
            reason: reason.into(),
            predicate: Box::new(predicate),
        });
        self
    }
}

impl fmt::Debug for VersionedTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedTest")
            .field("name", &self.name)
            .field("requirements", &self.requirements)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Cases and Results
// ============================================================================

/// Decision made for an expanded case before its body runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseDecision {
    /// Body will run.
    Execute,
    /// Body will not run.
    Skip {
        /// Human-readable reason.
        reason: String,
        /// Unavailable features behind the skip.
        features: Vec<FeatureName>,
    },
}

/// One logical test instantiated for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedCase {
    /// Logical test name.
    pub test: String,
    /// Version the case targets.
    pub version: VersionName,
    /// Pre-execution decision.
    pub decision: CaseDecision,
}

impl ExpandedCase {
    /// Returns the case identifier `{test}[{version}]`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}[{}]", self.test, self.version)
    }
}

/// Final outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Body completed without failure.
    Passed,
    /// Body never ran.
    Skipped {
        /// Human-readable reason.
        reason: String,
    },
    /// Body failed, errored, or panicked.
    Failed {
        /// Failure detail.
        failure: CaseFailure,
    },
}

/// Result of one expanded case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    /// Logical test name.
    pub test: String,
    /// Version the case targeted.
    pub version: VersionName,
    /// Outcome.
    pub outcome: CaseOutcome,
    /// Cleanup failures; never change the outcome.
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl CaseResult {
    /// Returns true when the case passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed)
    }

    /// Returns true when the case was skipped.
    #[must_use]
    pub const fn skipped(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Skipped { .. })
    }

    /// Returns true when the case failed.
    #[must_use]
    pub const fn failed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Failed { .. })
    }
}

/// Results of every case of one logical test, in version order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Logical test name.
    pub test: String,
    /// Case results.
    pub cases: Vec<CaseResult>,
}

/// Failed cases of a report, raised by [`TestReport::into_result`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{test}: {} case(s) failed: {}", failures.len(), failures.join("; "))]
pub struct ReportError {
    /// Logical test name.
    pub test: String,
    /// One line per failed case.
    pub failures: Vec<String>,
}

impl TestReport {
    /// Returns the number of passed cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|case| case.passed()).count()
    }

    /// Returns the number of skipped cases.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.cases.iter().filter(|case| case.skipped()).count()
    }

    /// Returns the number of failed cases.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.cases.iter().filter(|case| case.failed()).count()
    }

    /// Returns the result for a version, if the test expanded to it.
    #[must_use]
    pub fn case(&self, version: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|case| case.version.as_str() == version)
    }

    /// Converts the report into an error when any case failed.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] listing every failed case.
    pub fn into_result(self) -> Result<Self, ReportError> {
        let failures: Vec<String> = self
            .cases
            .iter()
            .filter_map(|case| match &case.outcome {
                CaseOutcome::Failed {
                    failure,
                } => Some(format!("[{}] {failure}", case.version)),
                CaseOutcome::Passed | CaseOutcome::Skipped { .. } => None,
            })
            .collect();
        if failures.is_empty() {
            Ok(self)
        } else {
            Err(ReportError {
                test: self.test,
                failures,
            })
        }
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Expands, decides, and executes versioned tests.
pub struct VersionedTestOrchestrator<'a> {
    /// Loaded configuration.
    store: &'a ConfigurationStore,
    /// Feature resolver.
    features: FeatureResolver<'a>,
    /// Shared payload factory.
    factory: TestDataFactory<'a>,
    /// API transport.
    client: &'a dyn ApiClient,
    /// Default for deprecated versions.
    include_deprecated: bool,
    /// Aggregated skips across every run.
    ledger: Mutex<SkipLedger>,
    /// Optional skip record sink.
    sink: Option<Box<dyn SkipSink + 'a>>,
}

impl<'a> VersionedTestOrchestrator<'a> {
    /// Creates an orchestrator over a store and client.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the data factory rejects the templates.
    pub fn new(store: &'a ConfigurationStore, client: &'a dyn ApiClient) -> Result<Self, BuildError> {
        Ok(Self::with_factory(TestDataFactory::new(store)?, client))
    }

    /// Creates an orchestrator with a preconfigured factory.
    #[must_use]
    pub fn with_factory(factory: TestDataFactory<'a>, client: &'a dyn ApiClient) -> Self {
        let store = factory.store();
        Self {
            store,
            features: FeatureResolver::new(store),
            factory,
            client,
            include_deprecated: store.settings().include_deprecated,
            ledger: Mutex::new(SkipLedger::new()),
            sink: None,
        }
    }

    /// Sets the feature policy used for skip decisions.
    #[must_use]
    pub const fn with_policy(mut self, policy: FeaturePolicy) -> Self {
        self.features = FeatureResolver::with_policy(self.store, policy);
        self
    }

    /// Forwards skip records to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: impl SkipSink + 'a) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Sets the default for deprecated versions.
    #[must_use]
    pub const fn with_include_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub const fn store(&self) -> &'a ConfigurationStore {
        self.store
    }

    /// Returns the shared data factory.
    #[must_use]
    pub const fn factory(&self) -> &TestDataFactory<'a> {
        &self.factory
    }

    /// Returns a snapshot of the skip ledger.
    #[must_use]
    pub fn skip_ledger(&self) -> SkipLedger {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Creates an execution context for a version outside of a test run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownVersion`] when the version is unknown.
    pub fn context(&self, version: &str) -> Result<TestExecutionContext<'_>, StoreError> {
        let descriptor = self.store.version_handle(version)?;
        Ok(TestExecutionContext::new(descriptor, self.features, &self.factory, self.client))
    }

    /// Expands a test into one decided case per applicable version.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the declaration references unknown
    /// versions or an inverted version range.
    pub fn expand(&self, test: &VersionedTest) -> Result<Vec<ExpandedCase>, OrchestratorError> {
        let requirements = &test.requirements;
        let index_of = |version: &VersionName| {
            self.store.version_index(version.as_str()).ok_or_else(|| {
                OrchestratorError::UnknownVersion {
                    test: test.name.clone(),
                    version: version.to_string(),
                }
            })
        };
        let min = requirements.min_version.as_ref().map(index_of).transpose()?;
        let max = requirements.max_version.as_ref().map(index_of).transpose()?;
        if let (Some(min_index), Some(max_index)) = (min, max)
            && min_index > max_index
            && let (Some(min), Some(max)) = (&requirements.min_version, &requirements.max_version)
        {
            return Err(OrchestratorError::InvertedRange {
                test: test.name.clone(),
                min: min.clone(),
                max: max.clone(),
            });
        }
        let versions: Vec<VersionName> = match &requirements.versions {
            Some(restricted) => {
                for version in restricted {
                    index_of(version)?;
                }
                self.store
                    .get_supported_versions()
                    .iter()
                    .filter(|version| restricted.contains(version))
                    .cloned()
                    .collect()
            }
            None => self.store.get_supported_versions().to_vec(),
        };
        let cases = versions
            .into_iter()
            .map(|version| {
                let decision = self.decide(test, &version);
                ExpandedCase {
                    test: test.name.clone(),
                    version,
                    decision,
                }
            })
            .collect();
        Ok(cases)
    }

    /// Decides whether a test runs against a version.
    ///
    /// Bounds naming unconfigured versions skip the case with an explicit
    /// reason; [`Self::expand`] rejects them before deciding.
    #[must_use]
    pub fn decide(&self, test: &VersionedTest, version: &VersionName) -> CaseDecision {
        let skip = |reason: String| CaseDecision::Skip {
            reason,
            features: Vec::new(),
        };
        let requirements = &test.requirements;
        let Ok(descriptor) = self.store.get_version_config(version.as_str()) else {
            return skip(format!("version {version} is not configured"));
        };
        let include_deprecated = requirements.include_deprecated.unwrap_or(self.include_deprecated);
        if descriptor.deprecated && !include_deprecated {
            return skip(format!("version {version} is deprecated"));
        }
        let Some(position) = self.store.version_index(version.as_str()) else {
            return skip(format!("version {version} is not configured"));
        };
        if let Some(min) = &requirements.min_version {
            match self.store.version_index(min.as_str()) {
                None => return skip(format!("minimum version {min} is not configured")),
                Some(bound) if position < bound => {
                    return skip(format!("version {version} below minimum {min}"));
                }
                Some(_) => {}
            }
        }
        if let Some(max) = &requirements.max_version {
            match self.store.version_index(max.as_str()) {
                None => return skip(format!("maximum version {max} is not configured")),
                Some(bound) if position > bound => {
                    return skip(format!("version {version} above maximum {max}"));
                }
                Some(_) => {}
            }
        }
        let missing = self.missing_features(requirements, version);
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(FeatureName::as_str).collect();
            let reason = if names.len() == 1 {
                format!("feature {} unavailable in version {version}", names.join(""))
            } else {
                format!("features {} unavailable in version {version}", names.join(", "))
            };
            return CaseDecision::Skip {
                reason,
                features: missing,
            };
        }
        if let Some(condition) =
            requirements.conditions.iter().find(|condition| !(condition.predicate)(descriptor))
        {
            return skip(condition.reason.clone());
        }
        CaseDecision::Execute
    }

    /// Runs a test sequentially or in parallel per `runner.parallel`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when expansion fails.
    pub fn run_configured(&self, test: &VersionedTest) -> Result<TestReport, OrchestratorError> {
        if self.store.settings().parallel { self.run_parallel(test) } else { self.run(test) }
    }

    /// Runs every case of a test sequentially.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when expansion fails; case failures are
    /// reported in the [`TestReport`].
    pub fn run(&self, test: &VersionedTest) -> Result<TestReport, OrchestratorError> {
        let cases = self.expand(test)?;
        let results = cases.into_iter().map(|case| self.finish(test, case)).collect();
        Ok(summarize(test, results))
    }

    /// Runs every executed case of a test on its own scoped thread.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when expansion fails; case failures are
    /// reported in the [`TestReport`].
    pub fn run_parallel(&self, test: &VersionedTest) -> Result<TestReport, OrchestratorError> {
        let cases = self.expand(test)?;
        let results = thread::scope(|scope| {
            let handles: Vec<_> = cases
                .into_iter()
                .map(|case| {
                    let version = case.version.clone();
                    (version, scope.spawn(move || self.finish(test, case)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(version, handle)| {
                    handle.join().unwrap_or_else(|payload| CaseResult {
                        test: test.name.clone(),
                        version,
                        outcome: CaseOutcome::Failed {
                            failure: CaseFailure::Panicked(panic_message(payload.as_ref())),
                        },
                        cleanup_failures: Vec::new(),
                    })
                })
                .collect()
        });
        Ok(summarize(test, results))
    }

    /// Records a skip or executes a case.
    fn finish(&self, test: &VersionedTest, case: ExpandedCase) -> CaseResult {
        match case.decision {
            CaseDecision::Skip {
                reason,
                features,
            } => {
                let record = SkipRecord {
                    test: case.test,
                    version: case.version,
                    features,
                    reason,
                };
                info!(
                    test = %record.test,
                    version = %record.version,
                    reason = %record.reason,
                    "case skipped"
                );
                self.ledger.lock().unwrap_or_else(PoisonError::into_inner).record(&record);
                if let Some(sink) = &self.sink {
                    sink.record(&record);
                }
                CaseResult {
                    test: record.test,
                    version: record.version,
                    outcome: CaseOutcome::Skipped {
                        reason: record.reason,
                    },
                    cleanup_failures: Vec::new(),
                }
            }
            CaseDecision::Execute => self.execute(test, case.version),
        }
    }

    /// Executes one case with panic isolation and guaranteed cleanup.
    fn execute(&self, test: &VersionedTest, version: VersionName) -> CaseResult {
        let failed = |failure: CaseFailure| CaseOutcome::Failed {
            failure,
        };
        let mut context = match self.context(version.as_str()) {
            Ok(context) => context,
            Err(err) => {
                return CaseResult {
                    test: test.name.clone(),
                    version,
                    outcome: failed(err.into()),
                    cleanup_failures: Vec::new(),
                };
            }
        };
        let outcome = match catch_unwind(AssertUnwindSafe(|| (test.body)(&mut context))) {
            Ok(Ok(())) => CaseOutcome::Passed,
            Ok(Err(failure)) => failed(failure),
            Err(payload) => failed(CaseFailure::Panicked(panic_message(payload.as_ref()))),
        };
        let cleanup_failures = context.cleanup();
        match &outcome {
            CaseOutcome::Failed {
                failure,
            } => warn!(test = %test.name, version = %version, failure = %failure, "case failed"),
            CaseOutcome::Passed | CaseOutcome::Skipped { .. } => {
                info!(test = %test.name, version = %version, "case passed");
            }
        }
        CaseResult {
            test: test.name.clone(),
            version,
            outcome,
            cleanup_failures,
        }
    }

    /// Collects unavailable features, including transitive prerequisites.
    fn missing_features(
        &self,
        requirements: &TestRequirements,
        version: &VersionName,
    ) -> Vec<FeatureName> {
        let dependencies =
            requirements.dependencies.as_ref().unwrap_or_else(|| self.store.feature_dependencies());
        let mut missing: Vec<FeatureName> = Vec::new();
        for feature in &requirements.features {
            let check =
                self.features.validate_dependencies(version.as_str(), feature.as_str(), dependencies);
            for name in check.missing {
                if !missing.contains(&name) {
                    missing.push(name);
                }
            }
        }
        missing
    }
}

/// Builds the report and logs the run summary.
fn summarize(test: &VersionedTest, cases: Vec<CaseResult>) -> TestReport {
    let report = TestReport {
        test: test.name.clone(),
        cases,
    };
    info!(
        test = %report.test,
        passed = report.passed(),
        skipped = report.skipped(),
        failed = report.failed(),
        "versioned test finished"
    );
    report
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
