// crates/version-matrix-core/src/features.rs
// ============================================================================
// Module: Feature Resolution
// Description: Per-version feature availability and prerequisite checks.
// Purpose: Answer "does version V support feature F" without throwing.
// Dependencies: version-matrix-config, serde
// ============================================================================

//! ## Overview
//! [`FeatureResolver`] is a pure read view over a [`ConfigurationStore`].
//! Under the default [`FeaturePolicy::Explicit`] policy a feature that a
//! version does not declare is unavailable. [`FeaturePolicy::Additive`] is an
//! opt-in alternative where an undeclared feature inherits the value declared
//! by the most recent earlier version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use serde::Serialize;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::FeatureName;
use version_matrix_config::VersionName;

// ============================================================================
// SECTION: Types
// ============================================================================

/// How undeclared features are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeaturePolicy {
    /// Undeclared features are unavailable.
    #[default]
    Explicit,
    /// Undeclared features inherit the nearest earlier declaration.
    Additive,
}

/// Outcome of a transitive prerequisite check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyCheck {
    /// True when the feature and every prerequisite are available.
    pub ok: bool,
    /// Unavailable features in discovery order, without duplicates.
    pub missing: Vec<FeatureName>,
}

/// Availability of every known feature across every version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureMatrix {
    /// Column order.
    pub versions: Vec<VersionName>,
    /// Availability per feature, aligned with `versions`.
    pub features: BTreeMap<FeatureName, Vec<bool>>,
}

/// Feature availability resolver.
#[derive(Debug, Clone, Copy)]
pub struct FeatureResolver<'a> {
    /// Loaded configuration.
    store: &'a ConfigurationStore,
    /// Undeclared feature policy.
    policy: FeaturePolicy,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

impl<'a> FeatureResolver<'a> {
    /// Creates a resolver using [`FeaturePolicy::Explicit`].
    #[must_use]
    pub const fn new(store: &'a ConfigurationStore) -> Self {
        Self::with_policy(store, FeaturePolicy::Explicit)
    }

    /// Creates a resolver with an explicit policy.
    #[must_use]
    pub const fn with_policy(store: &'a ConfigurationStore, policy: FeaturePolicy) -> Self {
        Self {
            store,
            policy,
        }
    }

    /// Returns the active policy.
    #[must_use]
    pub const fn policy(&self) -> FeaturePolicy {
        self.policy
    }

    /// Returns whether `feature` is available in `version`.
    ///
    /// Unknown versions and undeclared features resolve to `false` under the
    /// explicit policy; this never fails. A version listing the feature in
    /// `removed_features` reports it unavailable under either policy, and the
    /// additive lookback stops there.
    #[must_use]
    pub fn is_available(&self, version: &str, feature: &str) -> bool {
        let Some(index) = self.store.version_index(version) else {
            return false;
        };
        let versions = self.store.get_supported_versions();
        let lookback = match self.policy {
            FeaturePolicy::Explicit => 0,
            FeaturePolicy::Additive => index,
        };
        versions[index - lookback ..= index]
            .iter()
            .rev()
            .filter_map(|name| self.store.get_version_config(name.as_str()).ok())
            .find_map(|descriptor| {
                if descriptor.removed_features.contains(feature) {
                    Some(false)
                } else {
                    descriptor.feature(feature)
                }
            })
            .unwrap_or(false)
    }

    /// Returns every version supporting `feature`, in version order.
    #[must_use]
    pub fn versions_supporting(&self, feature: &str) -> Vec<VersionName> {
        self.store
            .get_supported_versions()
            .iter()
            .filter(|version| self.is_available(version.as_str(), feature))
            .cloned()
            .collect()
    }

    /// Returns the subset of `required` not available in `version`, keeping
    /// the caller's order. An empty result means every feature is satisfied.
    #[must_use]
    pub fn missing_features<F>(&self, version: &str, required: &[F]) -> Vec<FeatureName>
    where
        F: Borrow<str>,
    {
        let mut seen = BTreeSet::new();
        required
            .iter()
            .map(Borrow::borrow)
            .filter(|feature| !self.is_available(version, feature))
            .filter(|feature| seen.insert(*feature))
            .map(FeatureName::from)
            .collect()
    }

    /// Checks `feature` and its prerequisites transitively.
    ///
    /// Prerequisites are walked breadth-first from `dependencies`; cycles are
    /// tolerated. The feature itself is reported first when unavailable.
    #[must_use]
    pub fn validate_dependencies(
        &self,
        version: &str,
        feature: &str,
        dependencies: &BTreeMap<FeatureName, Vec<FeatureName>>,
    ) -> DependencyCheck {
        let mut visited: BTreeSet<&str> = BTreeSet::from([feature]);
        let mut queue: VecDeque<&str> = VecDeque::from([feature]);
        let mut missing = Vec::new();
        while let Some(current) = queue.pop_front() {
            if !self.is_available(version, current) {
                missing.push(FeatureName::from(current));
            }
            for prerequisite in dependencies.get(current).into_iter().flatten() {
                if visited.insert(prerequisite.as_str()) {
                    queue.push_back(prerequisite.as_str());
                }
            }
        }
        DependencyCheck {
            ok: missing.is_empty(),
            missing,
        }
    }

    /// Builds the availability matrix for every feature any version declares.
    #[must_use]
    pub fn feature_matrix(&self) -> FeatureMatrix {
        let versions = self.store.get_supported_versions().to_vec();
        let names: BTreeSet<&FeatureName> =
            self.store.descriptors().flat_map(|descriptor| descriptor.features.keys()).collect();
        let features = names
            .into_iter()
            .map(|feature| {
                let row = versions
                    .iter()
                    .map(|version| self.is_available(version.as_str(), feature.as_str()))
                    .collect();
                (feature.clone(), row)
            })
            .collect();
        FeatureMatrix {
            versions,
            features,
        }
    }
}
