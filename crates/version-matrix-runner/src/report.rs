// crates/version-matrix-runner/src/report.rs
// ============================================================================
// Module: Skip Reporting
// Description: Skip records, per-(feature, version) counts, and skip sinks.
// Purpose: Surface coverage gaps that skipped cases would otherwise hide.
// Dependencies: serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Every skipped case produces a [`SkipRecord`]. The orchestrator folds records
//! into a [`SkipLedger`] and forwards them to an optional [`SkipSink`]. Skips
//! caused by unavailable features are counted per `(feature, version)` pair;
//! other skips only count toward per-version totals.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Serialize;
use tracing::warn;
use version_matrix_config::FeatureName;
use version_matrix_config::VersionName;

// ============================================================================
// SECTION: Records
// ============================================================================

/// One skipped case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    /// Logical test name.
    pub test: String,
    /// Version the case was expanded for.
    pub version: VersionName,
    /// Unavailable features behind the skip; empty for non-feature skips.
    pub features: Vec<FeatureName>,
    /// Human-readable reason.
    pub reason: String,
}

/// Skip count for one `(feature, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipCount {
    /// Feature name.
    pub feature: FeatureName,
    /// Version name.
    pub version: VersionName,
    /// Number of skipped cases.
    pub count: usize,
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Aggregated skip counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipLedger {
    /// Counts per unavailable feature and version.
    by_feature: BTreeMap<(FeatureName, VersionName), usize>,
    /// Total skips per version.
    by_version: BTreeMap<VersionName, usize>,
}

impl SkipLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one record into the ledger.
    pub fn record(&mut self, record: &SkipRecord) {
        *self.by_version.entry(record.version.clone()).or_default() += 1;
        for feature in &record.features {
            *self.by_feature.entry((feature.clone(), record.version.clone())).or_default() += 1;
        }
    }

    /// Returns the skip count for a feature in a version.
    #[must_use]
    pub fn count(&self, feature: &str, version: &str) -> usize {
        self.by_feature
            .iter()
            .find(|((name, ver), _)| name.as_str() == feature && ver.as_str() == version)
            .map_or(0, |(_, count)| *count)
    }

    /// Returns total skips recorded for a version.
    #[must_use]
    pub fn version_total(&self, version: &str) -> usize {
        self.by_version.get(version).copied().unwrap_or(0)
    }

    /// Returns total skips recorded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_version.values().sum()
    }

    /// Returns per-(feature, version) counts sorted by feature then version.
    #[must_use]
    pub fn entries(&self) -> Vec<SkipCount> {
        self.by_feature
            .iter()
            .map(|((feature, version), count)| SkipCount {
                feature: feature.clone(),
                version: version.clone(),
                count: *count,
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Receives skip records as they occur.
pub trait SkipSink: Send + Sync {
    /// Records one skip.
    fn record(&self, record: &SkipRecord);
}

/// Skip sink that writes one JSON object per line.
pub struct JsonLinesSkipSink<W: Write + Send> {
    /// Output writer.
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSkipSink<W> {
    /// Creates a sink over `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> SkipSink for JsonLinesSkipSink<W> {
    fn record(&self, record: &SkipRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                warn!(
                    test = %record.test,
                    version = %record.version,
                    error = %err,
                    "skip record serialization failed"
                );
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            warn!(
                test = %record.test,
                version = %record.version,
                error = %err,
                "skip record write failed"
            );
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::Write;

    use version_matrix_config::FeatureName;
    use version_matrix_config::VersionName;

    use super::JsonLinesSkipSink;
    use super::SkipLedger;
    use super::SkipRecord;
    use super::SkipSink;

    fn record(version: &str, features: &[&str]) -> SkipRecord {
        SkipRecord {
            test: "create_health_record".to_string(),
            version: VersionName::from(version),
            features: features.iter().copied().map(FeatureName::from).collect(),
            reason: "skipped".to_string(),
        }
    }

    #[test]
    fn ledger_counts_feature_version_pairs() {
        let mut ledger = SkipLedger::new();
        ledger.record(&record("v1", &["health_records"]));
        ledger.record(&record("v1", &["health_records", "vaccination_reminders"]));
        ledger.record(&record("v1", &[]));
        assert_eq!(ledger.count("health_records", "v1"), 2);
        assert_eq!(ledger.count("vaccination_reminders", "v1"), 1);
        assert_eq!(ledger.count("health_records", "v2"), 0);
        assert_eq!(ledger.version_total("v1"), 3);
        assert_eq!(ledger.total(), 3);
        assert_eq!(ledger.entries().len(), 2);
    }

    /// Writer that rejects every write.
    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_do_not_escape_the_sink() {
        let sink = JsonLinesSkipSink::new(FailingWriter);
        sink.record(&record("v1", &["health_records"]));
        sink.record(&record("v2", &[]));
    }

    #[test]
    fn poisoned_sink_keeps_recording() {
        let sink = JsonLinesSkipSink::new(Vec::new());
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = sink.writer.lock();
            std::panic::panic_any("poison");
        }));
        assert!(poisoned.is_err());
        assert!(sink.writer.is_poisoned());

        sink.record(&record("v1", &["health_records"]));
        let output = String::from_utf8(sink.into_inner()).unwrap_or_default();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn json_lines_sink_writes_one_object_per_skip() {
        let sink = JsonLinesSkipSink::new(Vec::new());
        sink.record(&record("v1", &["health_records"]));
        sink.record(&record("v2", &[]));
        let output = String::from_utf8(sink.into_inner()).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap_or_default();
        assert_eq!(first["version"], "v1");
        assert_eq!(first["features"][0], "health_records");
    }
}
