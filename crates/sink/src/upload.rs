//! Per-document upload with failure accounting.
//!
//! Every document is indexed on its own. A failing document is counted and
//! described in [`UploadResult::errors`]; the batch always runs to the end.
//! Only an input that is not a document collection at all is rejected, and
//! that happens before the first request.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use scanpost_core::metrics::{
    LABEL_INDEX, SINK_DOCUMENTS_FAILED_TOTAL, SINK_DOCUMENTS_INDEXED_TOTAL,
};

use crate::client::SearchSink;
use crate::error::IngestError;
use crate::sanitize::sanitize;

/// Documents to index.
///
/// A `Sequence` gets keys synthesized per element, so they are always unique
/// within one call. For `Keyed` input, uniqueness is up to the caller; a
/// repeated key simply overwrites the earlier document in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSet {
    /// Unkeyed documents, in order
    Sequence(Vec<Value>),
    /// `(key, document)` pairs, in order
    Keyed(Vec<(String, Value)>),
}

impl DocumentSet {
    /// Interprets a parsed JSON value: arrays are sequences, objects are keyed
    /// mappings.
    ///
    /// # Errors
    ///
    /// `IngestError::InvalidInput` for any other JSON value.
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        match value {
            Value::Array(items) => Ok(Self::Sequence(items)),
            Value::Object(map) => Ok(Self::Keyed(map.into_iter().collect())),
            other => Err(IngestError::InvalidInput(format!(
                "unsupported data type: {}, must be a list or a mapping",
                json_type_name(&other)
            ))),
        }
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(items) => items.len(),
            Self::Keyed(pairs) => pairs.len(),
        }
    }

    /// Whether there is nothing to index.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves every document to a `(key, document)` pair.
    ///
    /// Sequence keys are `"{unix timestamp}-{position}"`; the timestamp is
    /// taken once per call so keys only differ by position.
    pub fn into_keyed(self) -> Vec<(String, Value)> {
        match self {
            Self::Keyed(pairs) => pairs,
            Self::Sequence(items) => {
                let stamp = timestamp_key();
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, doc)| (format!("{stamp}-{i}"), doc))
                    .collect()
            }
        }
    }
}

/// Result of one upload call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Documents the store reported as created or updated
    pub successful: usize,
    /// Documents that failed for any reason
    pub failed: usize,
    /// One human-readable line per failed document, in input order
    pub errors: Vec<String>,
}

impl UploadResult {
    /// Documents attempted.
    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    /// Whether every document made it.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn record_failure(&mut self, detail: String) {
        self.failed += 1;
        self.errors.push(detail);
    }
}

/// Indexes every document of `documents` into `index`.
pub async fn upload<S: SearchSink>(sink: &S, index: &str, documents: DocumentSet) -> UploadResult {
    let kind = match &documents {
        DocumentSet::Sequence(_) => "list",
        DocumentSet::Keyed(_) => "mapping",
    };
    info!(index, kind, count = documents.len(), "processing documents");

    let mut result = UploadResult::default();

    for (key, document) in documents.into_keyed() {
        let Value::Object(fields) = document else {
            result.record_failure(format!(
                "Document {key} skipped: expected a JSON object, got {}",
                json_type_name(&document)
            ));
            continue;
        };

        let cleaned = sanitize(&fields);
        match sink.index_document(index, &key, &cleaned).await {
            Ok(outcome) if outcome.is_success() => {
                debug!(index, key = %key, %outcome, "document indexed");
                result.successful += 1;
            }
            Ok(outcome) => {
                result.record_failure(format!("Document {key} failed: result={outcome}"));
            }
            Err(e) => {
                result.record_failure(format!("Error indexing document {key}: {e}"));
            }
        }
    }

    let index_label = index.to_owned();
    metrics::counter!(SINK_DOCUMENTS_INDEXED_TOTAL, LABEL_INDEX => index_label.clone())
        .increment(u64::try_from(result.successful).unwrap_or(u64::MAX));
    metrics::counter!(SINK_DOCUMENTS_FAILED_TOTAL, LABEL_INDEX => index_label)
        .increment(u64::try_from(result.failed).unwrap_or(u64::MAX));

    if result.is_clean() {
        info!(index, successful = result.successful, "indexing complete");
    } else {
        warn!(
            index,
            successful = result.successful,
            failed = result.failed,
            "indexing complete with failures"
        );
    }

    result
}

/// Indexes a raw JSON value: arrays as sequences, objects as keyed mappings.
///
/// # Errors
///
/// `IngestError::InvalidInput` for any other JSON value; no request is made.
pub async fn upload_value<S: SearchSink>(
    sink: &S,
    index: &str,
    value: Value,
) -> Result<UploadResult, IngestError> {
    let documents = DocumentSet::from_value(value).inspect_err(|e| {
        tracing::error!(index, error = %e, "refusing to upload");
    })?;
    Ok(upload(sink, index, documents).await)
}

/// Wall-clock unix timestamp with sub-second precision, e.g. `1718000000.123456`.
pub(crate) fn timestamp_key() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    format!("{secs}")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Convenience for callers holding a single JSON object.
pub(crate) fn object_or_invalid(value: Value) -> Result<Map<String, Value>, IngestError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(IngestError::InvalidInput(format!(
            "expected a single JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemorySink;
    use serde_json::json;

    #[test]
    fn from_value_shapes() {
        assert!(matches!(
            DocumentSet::from_value(json!([1, 2])),
            Ok(DocumentSet::Sequence(_))
        ));
        assert!(matches!(
            DocumentSet::from_value(json!({"k": {}})),
            Ok(DocumentSet::Keyed(_))
        ));
        assert!(matches!(
            DocumentSet::from_value(json!("text")),
            Err(IngestError::InvalidInput(_))
        ));
    }

    #[test]
    fn sequence_keys_are_unique_and_positional() {
        let keyed = DocumentSet::Sequence(vec![json!({}), json!({}), json!({})]).into_keyed();
        let keys: Vec<&String> = keyed.iter().map(|(k, _)| k).collect();
        assert!(keys[0].ends_with("-0"));
        assert!(keys[2].ends_with("-2"));
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn keyed_order_preserved() {
        let set = DocumentSet::from_value(json!({"b": {}, "a": {}})).unwrap();
        let keys: Vec<String> = set.into_keyed().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[tokio::test]
    async fn all_documents_succeed() {
        let sink = InMemorySink::new();
        let docs = DocumentSet::Sequence(vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})]);
        let result = upload(&sink, "idx", docs).await;
        assert_eq!(result.successful, 3);
        assert_eq!(result.failed, 0);
        assert!(result.errors.is_empty());
        assert_eq!(sink.documents("idx").len(), 3);
    }

    #[tokio::test]
    async fn one_failing_document_does_not_stop_batch() {
        let sink = InMemorySink::new().with_failing_id("k2");
        let docs = DocumentSet::Keyed(vec![
            ("k1".to_owned(), json!({"v": 1})),
            ("k2".to_owned(), json!({"v": 2})),
            ("k3".to_owned(), json!({"v": 3})),
        ]);
        let result = upload(&sink, "idx", docs).await;
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("k2"));
        assert_eq!(sink.index_calls(), 3);
    }

    #[tokio::test]
    async fn non_success_outcome_counts_as_failure() {
        let sink = InMemorySink::new().with_noop_id("same");
        let docs = DocumentSet::Keyed(vec![("same".to_owned(), json!({}))]);
        let result = upload(&sink, "idx", docs).await;
        assert_eq!(result.failed, 1);
        assert!(result.errors[0].contains("noop"));
    }

    #[tokio::test]
    async fn non_object_document_is_a_failure() {
        let sink = InMemorySink::new();
        let docs = DocumentSet::Sequence(vec![json!({"ok": true}), json!(42)]);
        let result = upload(&sink, "idx", docs).await;
        assert_eq!(result.successful, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(sink.index_calls(), 1);
    }

    #[tokio::test]
    async fn documents_are_sanitized_before_indexing() {
        let sink = InMemorySink::new();
        let docs = DocumentSet::Keyed(vec![("k".to_owned(), json!({"host": null}))]);
        upload(&sink, "idx", docs).await;
        assert_eq!(sink.documents("idx")[0].1["host"], "");
    }

    #[tokio::test]
    async fn upload_value_rejects_scalar_without_io() {
        let sink = InMemorySink::new();
        let err = upload_value(&sink, "idx", json!("not documents"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidInput(_)));
        assert_eq!(sink.index_calls(), 0);
    }

    #[tokio::test]
    async fn all_failing_still_returns_full_result() {
        let sink = InMemorySink::new().with_failing_id("a").with_failing_id("b");
        let docs = DocumentSet::Keyed(vec![
            ("a".to_owned(), json!({})),
            ("b".to_owned(), json!({})),
        ]);
        let result = upload(&sink, "idx", docs).await;
        assert_eq!(result.successful, 0);
        assert_eq!(result.failed, 2);
        assert_eq!(result.total(), 2);
        assert!(!result.is_clean());
    }

    #[test]
    fn object_or_invalid_rejects_arrays() {
        assert!(object_or_invalid(json!([])).is_err());
        assert!(object_or_invalid(json!({"a": 1})).is_ok());
    }
}
