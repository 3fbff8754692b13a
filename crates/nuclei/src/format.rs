//! Finding enrichment and keying.
//!
//! Turns the scanner's JSON array into keyed documents ready for indexing:
//! each finding is joined with its asset, stamped with `@timestamp`, and keyed
//! by `"{template-id}-{matched-at}"` so re-running the same scan updates the
//! same documents instead of piling up duplicates.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use scanpost_core::types::Asset;
use scanpost_sink::DocumentSet;

use crate::error::NucleiError;

const UNKNOWN_TEMPLATE: &str = "unknown-template";

/// Characters that cannot appear in a document id.
const KEY_UNSAFE: [char; 4] = ['/', ':', '?', '#'];

/// Enriches findings with the assets of one job.
#[derive(Debug, Clone, Default)]
pub struct FindingFormatter {
    parents: HashMap<String, Value>,
}

impl FindingFormatter {
    /// Builds the `asset_string -> asset_parent_id` lookup. When an asset
    /// string repeats, the last entry wins.
    pub fn new(population: &[Asset]) -> Self {
        let parents = population
            .iter()
            .map(|asset| (asset.asset_string.clone(), asset.asset_parent_id.clone()))
            .collect();
        Self { parents }
    }

    /// Formats an already-parsed findings array.
    ///
    /// `source` names the input in error messages. Non-object elements are
    /// skipped. When two findings produce the same key, the later one
    /// replaces the earlier one at the earlier one's position.
    ///
    /// # Errors
    ///
    /// `NucleiError::FindingsParse` when `findings` is not an array.
    pub fn format_value(&self, findings: Value, source: &str) -> Result<DocumentSet, NucleiError> {
        let Value::Array(entries) = findings else {
            return Err(NucleiError::FindingsParse {
                path: source.to_owned(),
                reason: "expected a JSON array of findings".to_owned(),
            });
        };
        info!(source, count = entries.len(), "loaded findings");

        let mut documents: Vec<(String, Value)> = Vec::with_capacity(entries.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.into_iter().enumerate() {
            let Value::Object(mut finding) = entry else {
                warn!(source, position = i, "skipping finding that is not a JSON object");
                continue;
            };

            self.enrich(&mut finding);
            let key = document_key(&finding, i);

            match positions.get(&key) {
                Some(&at) => documents[at].1 = Value::Object(finding),
                None => {
                    positions.insert(key.clone(), documents.len());
                    documents.push((key, Value::Object(finding)));
                }
            }
        }

        info!(source, count = documents.len(), "formatted findings");
        Ok(DocumentSet::Keyed(documents))
    }

    /// Reads and formats a findings file.
    ///
    /// # Errors
    ///
    /// - `NucleiError::Io`: the file cannot be read
    /// - `NucleiError::FindingsParse`: the content is not a JSON array
    pub async fn format_file(&self, path: &Path) -> Result<DocumentSet, NucleiError> {
        let shown = path.display().to_string();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| NucleiError::Io {
                path: shown.clone(),
                source,
            })?;

        let findings: Value =
            serde_json::from_str(&text).map_err(|e| NucleiError::FindingsParse {
                path: shown.clone(),
                reason: e.to_string(),
            })?;

        self.format_value(findings, &shown)
    }

    fn enrich(&self, finding: &mut Map<String, Value>) {
        let parent = finding
            .get("host")
            .and_then(Value::as_str)
            .and_then(|host| self.parents.get_key_value(host));
        if let Some((host, parent_id)) = parent {
            finding.insert("asset_string".to_owned(), Value::String(host.clone()));
            finding.insert("asset_parent_id".to_owned(), parent_id.clone());
        }

        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        finding.insert("@timestamp".to_owned(), Value::String(timestamp));
    }
}

/// Reads `path` and formats its findings against `population`.
pub async fn format_findings(path: &Path, population: &[Asset]) -> Result<DocumentSet, NucleiError> {
    FindingFormatter::new(population).format_file(path).await
}

/// Formats an already-parsed findings array against `population`.
pub fn format_findings_value(
    findings: Value,
    population: &[Asset],
) -> Result<DocumentSet, NucleiError> {
    FindingFormatter::new(population).format_value(findings, "<inline>")
}

fn document_key(finding: &Map<String, Value>, position: usize) -> String {
    let template = field_text(finding, "template-id")
        .unwrap_or_else(|| UNKNOWN_TEMPLATE.to_owned());
    let matched_at = field_text(finding, "matched-at")
        .unwrap_or_else(|| format!("item-{position}"));
    format!("{template}-{}", matched_at.replace(KEY_UNSAFE, "_"))
}

/// String fields as-is, other scalars rendered, `null` and missing as `None`.
fn field_text(finding: &Map<String, Value>, field: &str) -> Option<String> {
    match finding.get(field)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
