//! Severity filtering and statistics.

use std::path::Path;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;
use tracing::{info, warn};

use scanpost_core::types::Severity;

use crate::error::NucleiError;

/// Severities passed to `-severity`: every known severity except the excluded
/// ones, in scanner order.
///
/// `None` and an empty list exclude nothing. Names are matched
/// case-insensitively; unrecognized names are ignored.
pub fn create_include_severities(exclude: Option<&[String]>) -> Vec<Severity> {
    let Some(exclude) = exclude else {
        return Severity::ALL.to_vec();
    };

    let mut excluded = Vec::with_capacity(exclude.len());
    for name in exclude {
        match Severity::from_str_loose(name) {
            Some(severity) => excluded.push(severity),
            None => warn!(severity = %name, "ignoring unknown severity in exclude list"),
        }
    }

    Severity::ALL
        .into_iter()
        .filter(|severity| !excluded.contains(severity))
        .collect()
}

/// Severities that always appear in [`SeverityCounts`], even at zero.
const SEEDED: [Severity; 5] = [
    Severity::Info,
    Severity::Low,
    Severity::Medium,
    Severity::High,
    Severity::Critical,
];

/// Findings per severity name.
///
/// Seeded with `info`, `low`, `medium`, `high` and `critical` at zero; other
/// names are appended in order of first appearance. Serializes as a JSON
/// object in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityCounts {
    counts: Vec<(String, usize)>,
}

impl Default for SeverityCounts {
    fn default() -> Self {
        Self {
            counts: SEEDED.iter().map(|s| (s.as_str().to_owned(), 0)).collect(),
        }
    }
}

impl SeverityCounts {
    /// Count for `name`, zero when never seen.
    pub fn get(&self, name: &str) -> usize {
        self.counts
            .iter()
            .find(|(n, _)| n == name)
            .map_or(0, |(_, count)| *count)
    }

    /// Sum over every severity.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    /// `(name, count)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    fn record(&mut self, name: &str) {
        match self.counts.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((name.to_owned(), 1)),
        }
    }
}

impl Serialize for SeverityCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (name, count) in &self.counts {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// Counts `info.severity` over an already-parsed findings array.
///
/// A finding without a severity is counted as `unknown`.
///
/// # Errors
///
/// `NucleiError::FindingsParse` when `findings` is not an array.
pub fn count_severities_value(findings: &Value, source: &str) -> Result<SeverityCounts, NucleiError> {
    let Value::Array(entries) = findings else {
        return Err(NucleiError::FindingsParse {
            path: source.to_owned(),
            reason: "expected a JSON array of findings".to_owned(),
        });
    };

    let mut counts = SeverityCounts::default();
    for entry in entries {
        let severity = entry
            .get("info")
            .and_then(|info| info.get("severity"))
            .and_then(Value::as_str)
            .unwrap_or(Severity::Unknown.as_str());
        counts.record(severity);
    }
    Ok(counts)
}

/// Reads a findings file and counts its severities.
///
/// # Errors
///
/// - `NucleiError::Io`: the file cannot be read
/// - `NucleiError::FindingsParse`: the content is not a JSON array
pub async fn count_severities(path: &Path) -> Result<SeverityCounts, NucleiError> {
    let shown = path.display().to_string();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| NucleiError::Io {
            path: shown.clone(),
            source,
        })?;

    let findings: Value = serde_json::from_str(&text).map_err(|e| NucleiError::FindingsParse {
        path: shown.clone(),
        reason: e.to_string(),
    })?;

    let counts = count_severities_value(&findings, &shown)?;
    for (severity, count) in counts.iter() {
        info!(severity, count, "severity count");
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_exclusions_yields_full_universe() {
        assert_eq!(create_include_severities(None), Severity::ALL.to_vec());
        assert_eq!(create_include_severities(Some(&[][..])), Severity::ALL.to_vec());
    }

    #[test]
    fn excluded_severities_are_removed_in_order() {
        let exclude = vec!["info".to_owned(), "LOW".to_owned()];
        assert_eq!(
            create_include_severities(Some(exclude.as_slice())),
            vec![
                Severity::Medium,
                Severity::High,
                Severity::Critical,
                Severity::Unknown
            ]
        );
    }

    #[test]
    fn excluding_low_and_high_keeps_the_rest() {
        let exclude = vec!["low".to_owned(), "high".to_owned()];
        let include = create_include_severities(Some(exclude.as_slice()));
        assert_eq!(
            include,
            vec![
                Severity::Info,
                Severity::Medium,
                Severity::Critical,
                Severity::Unknown
            ]
        );
        let names: Vec<&str> = include.iter().map(Severity::as_str).collect();
        assert_eq!(names.join(","), "info,medium,critical,unknown");
    }

    #[test]
    fn unknown_exclusion_names_are_ignored() {
        let exclude = vec!["catastrophic".to_owned()];
        assert_eq!(
            create_include_severities(Some(exclude.as_slice())).len(),
            Severity::ALL.len()
        );
    }

    #[test]
    fn counts_are_seeded_with_zero() {
        let counts = count_severities_value(&json!([]), "inline").unwrap();
        let names: Vec<&str> = counts.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["info", "low", "medium", "high", "critical"]);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn missing_severity_counts_as_unknown() {
        let findings = json!([
            {"info": {"severity": "high"}},
            {"info": {"severity": "high"}},
            {"info": {}},
            {"host": "x"},
            {"info": {"severity": "custom"}}
        ]);
        let counts = count_severities_value(&findings, "inline").unwrap();
        assert_eq!(counts.get("high"), 2);
        assert_eq!(counts.get("unknown"), 2);
        assert_eq!(counts.get("custom"), 1);
        assert_eq!(counts.get("critical"), 0);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn serializes_in_display_order() {
        let counts =
            count_severities_value(&json!([{"info": {"severity": "unknown"}}]), "inline").unwrap();
        let text = serde_json::to_string(&counts).unwrap();
        assert_eq!(
            text,
            r#"{"info":0,"low":0,"medium":0,"high":0,"critical":0,"unknown":1}"#
        );
    }

    #[test]
    fn non_array_is_parse_error() {
        let err = count_severities_value(&json!({"a": 1}), "inline").unwrap_err();
        assert!(matches!(err, NucleiError::FindingsParse { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = count_severities(Path::new("/nonexistent/scanpost/out.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, NucleiError::Io { .. }));
    }
}
