// crates/version-matrix-config/src/lint.rs
// ============================================================================
// Module: Configuration Linter
// Description: Advisory checks over a loaded configuration store.
// Purpose: Surface evolution-policy violations without failing the load.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Versions are expected to evolve additively: a feature enabled in one
//! version stays enabled in every later version unless that later version
//! lists it under `removed_features`. The linter reports departures from that
//! convention along with other authoring smells. Findings never block tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;

use crate::identifiers::FeatureName;
use crate::identifiers::VersionName;
use crate::store::ConfigurationStore;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lint finding category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LintKind {
    /// Feature disappeared in a later version without being retired.
    FeatureRegression,
    /// Deprecated version without a sunset date.
    MissingSunsetDate,
    /// Endpoint template parameter outside the vocabulary.
    UnknownParameter,
}

/// Advisory finding produced by [`lint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    /// Finding category.
    pub kind: LintKind,
    /// Version the finding is reported against.
    pub version: VersionName,
    /// Human-readable description.
    pub message: String,
}

// ============================================================================
// SECTION: Linting
// ============================================================================

/// Runs every advisory check over the store.
#[must_use]
pub fn lint(store: &ConfigurationStore) -> Vec<LintFinding> {
    let mut findings = feature_regressions(store);
    for descriptor in store.descriptors() {
        if descriptor.deprecated && descriptor.sunset_date.is_none() {
            findings.push(LintFinding {
                kind: LintKind::MissingSunsetDate,
                version: descriptor.name.clone(),
                message: format!("version {} is deprecated without a sunset_date", descriptor.name),
            });
        }
    }
    findings.extend(store.warnings().iter().map(|warning| LintFinding {
        kind: LintKind::UnknownParameter,
        version: warning.version.clone(),
        message: warning.message(),
    }));
    findings
}

/// Reports features that were enabled and later vanished without retirement.
fn feature_regressions(store: &ConfigurationStore) -> Vec<LintFinding> {
    let features: BTreeSet<&FeatureName> =
        store.descriptors().flat_map(|descriptor| descriptor.features.keys()).collect();
    let mut findings = Vec::new();
    for feature in features {
        let mut enabled_in: Option<&VersionName> = None;
        for descriptor in store.descriptors() {
            if descriptor.removed_features.contains(feature) {
                enabled_in = None;
                continue;
            }
            match (descriptor.feature(feature.as_str()), enabled_in) {
                (Some(true), None) => enabled_in = Some(&descriptor.name),
                (Some(true), Some(_)) => {}
                (_, Some(since)) => findings.push(LintFinding {
                    kind: LintKind::FeatureRegression,
                    version: descriptor.name.clone(),
                    message: format!(
                        "feature {feature} is enabled in {since} but unavailable in {}",
                        descriptor.name
                    ),
                }),
                (_, None) => {}
            }
        }
    }
    findings
}
