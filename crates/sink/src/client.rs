//! Search store abstraction.
//!
//! The [`SearchSink`] trait is the only surface the ingestion code uses.
//! [`ElasticsearchSink`] talks to an Elasticsearch-compatible HTTP API;
//! [`InMemorySink`] keeps documents in memory for dry runs and tests.
//!
//! ```text
//!          upload / ingest
//!                 │
//!                 ▼
//!          ┌────────────┐
//!          │ SearchSink │ (trait)
//!          └────────────┘
//!             │      │
//!             ▼      ▼
//!   Elasticsearch   InMemory
//!        │
//!        ▼
//!   HTTP :9200
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::SinkConfig;
use crate::error::IngestError;

/// Outcome tag reported by the store for one indexed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// New document
    Created,
    /// Existing document replaced
    Updated,
    /// Anything else the store reported (`noop`, `not_found`, ...)
    Other(String),
}

impl IndexOutcome {
    /// Parses the store's `result` field.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "created" => Self::Created,
            "updated" => Self::Updated,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Only `created` and `updated` count as success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

impl fmt::Display for IndexOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// Operations consumed from the search store.
///
/// Implementations must be safe to share across tasks; a handle is reused for
/// every document of an ingestion call.
pub trait SearchSink: Send + Sync {
    /// Whether `index` exists.
    fn index_exists(&self, index: &str) -> impl Future<Output = Result<bool, IngestError>> + Send;

    /// Creates `index`. Creating an index that already exists is not an error.
    fn create_index(&self, index: &str) -> impl Future<Output = Result<(), IngestError>> + Send;

    /// Stores `document` under `id` in `index`.
    ///
    /// # Errors
    ///
    /// `IngestError::Request` when the store rejects the request or is unreachable.
    fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Map<String, Value>,
    ) -> impl Future<Output = Result<IndexOutcome, IngestError>> + Send;
}

impl<S: SearchSink> SearchSink for &S {
    fn index_exists(&self, index: &str) -> impl Future<Output = Result<bool, IngestError>> + Send {
        (**self).index_exists(index)
    }

    fn create_index(&self, index: &str) -> impl Future<Output = Result<(), IngestError>> + Send {
        (**self).create_index(index)
    }

    fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Map<String, Value>,
    ) -> impl Future<Output = Result<IndexOutcome, IngestError>> + Send {
        (**self).index_document(index, id, document)
    }
}

/// Elasticsearch-compatible HTTP sink.
///
/// Uses the document API (`PUT /{index}/_doc/{id}`), one request per document.
/// The inner `reqwest::Client` pools connections, so cloning is cheap.
#[derive(Clone)]
pub struct ElasticsearchSink {
    client: Client,
    base_url: Url,
}

impl ElasticsearchSink {
    /// Builds a client for `config` and checks that the store answers.
    ///
    /// # Errors
    ///
    /// - `IngestError::Config`: invalid config
    /// - `IngestError::Connection`: store unreachable or not answering 2xx on `/`
    pub async fn connect(config: &SinkConfig) -> Result<Self, IngestError> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url()).map_err(|e| IngestError::Config {
            field: "host".to_owned(),
            reason: format!("invalid sink url {}: {e}", config.base_url()),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IngestError::Connection(format!("failed to build http client: {e}")))?;

        let response = client.get(base_url.clone()).send().await.map_err(|e| {
            IngestError::Connection(format!("failed to reach {base_url}: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(IngestError::Connection(format!(
                "{base_url} answered {}",
                response.status()
            )));
        }

        info!(url = %base_url, "connected to search sink");
        Ok(Self { client, base_url })
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, IngestError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| IngestError::Config {
                field: "host".to_owned(),
                reason: format!("{} cannot be used as a base url", self.base_url),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }
}

impl SearchSink for ElasticsearchSink {
    async fn index_exists(&self, index: &str) -> Result<bool, IngestError> {
        let url = self.endpoint(&[index])?;
        let response = self.client.head(url).send().await.map_err(|e| {
            IngestError::IndexCreation {
                index: index.to_owned(),
                reason: format!("existence check failed: {e}"),
            }
        })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(IngestError::IndexCreation {
                index: index.to_owned(),
                reason: format!("existence check answered {status}"),
            }),
        }
    }

    async fn create_index(&self, index: &str) -> Result<(), IngestError> {
        let url = self.endpoint(&[index])?;
        let response = self.client.put(url).send().await.map_err(|e| {
            IngestError::IndexCreation {
                index: index.to_owned(),
                reason: format!("create request failed: {e}"),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains("resource_already_exists_exception") {
            debug!(index, "index created concurrently");
            return Ok(());
        }

        Err(IngestError::IndexCreation {
            index: index.to_owned(),
            reason: format!("create answered {status}: {body}"),
        })
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Map<String, Value>,
    ) -> Result<IndexOutcome, IngestError> {
        let url = self.endpoint(&[index, "_doc", id])?;
        let response = self
            .client
            .put(url)
            .json(document)
            .send()
            .await
            .map_err(|e| IngestError::Request(format!("index request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Request(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IngestError::Request(format!("unreadable index response: {e}")))?;

        let tag = body.get("result").and_then(Value::as_str).unwrap_or("missing");
        Ok(IndexOutcome::from_tag(tag))
    }
}

/// In-memory sink.
///
/// Behaves like a store with upsert semantics: the first write of an id is
/// `created`, later ones `updated`. Individual ids can be made to fail or to
/// report a non-success outcome, and index creation can be made to fail.
#[derive(Default)]
pub struct InMemorySink {
    indices: Mutex<BTreeMap<String, Vec<(String, Map<String, Value>)>>>,
    index_calls: Mutex<usize>,
    failing_ids: HashSet<String>,
    noop_ids: HashSet<String>,
    fail_index_creation: bool,
}

impl InMemorySink {
    /// Empty sink with no indices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexing `id` returns a request error.
    pub fn with_failing_id(mut self, id: impl Into<String>) -> Self {
        self.failing_ids.insert(id.into());
        self
    }

    /// Indexing `id` reports a `noop` outcome.
    pub fn with_noop_id(mut self, id: impl Into<String>) -> Self {
        self.noop_ids.insert(id.into());
        self
    }

    /// `create_index` always fails.
    pub fn with_failing_index_creation(mut self) -> Self {
        self.fail_index_creation = true;
        self
    }

    /// Pre-creates `index`.
    pub fn with_index(self, index: impl Into<String>) -> Self {
        self.lock_indices().entry(index.into()).or_default();
        self
    }

    /// Whether `index` exists.
    pub fn has_index(&self, index: &str) -> bool {
        self.lock_indices().contains_key(index)
    }

    /// Documents stored in `index`, in write order.
    pub fn documents(&self, index: &str) -> Vec<(String, Map<String, Value>)> {
        self.lock_indices().get(index).cloned().unwrap_or_default()
    }

    /// Number of `index_document` calls, including failed ones.
    pub fn index_calls(&self) -> usize {
        *self
            .index_calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_indices(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<(String, Map<String, Value>)>>> {
        self.indices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SearchSink for InMemorySink {
    async fn index_exists(&self, index: &str) -> Result<bool, IngestError> {
        Ok(self.has_index(index))
    }

    async fn create_index(&self, index: &str) -> Result<(), IngestError> {
        if self.fail_index_creation {
            return Err(IngestError::IndexCreation {
                index: index.to_owned(),
                reason: "index creation disabled".to_owned(),
            });
        }
        self.lock_indices().entry(index.to_owned()).or_default();
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Map<String, Value>,
    ) -> Result<IndexOutcome, IngestError> {
        *self
            .index_calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;

        if self.failing_ids.contains(id) {
            return Err(IngestError::Request(format!("simulated failure for {id}")));
        }
        if self.noop_ids.contains(id) {
            return Ok(IndexOutcome::Other("noop".to_owned()));
        }

        let mut indices = self.lock_indices();
        let docs = indices.entry(index.to_owned()).or_default();
        match docs.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, stored)) => {
                *stored = document.clone();
                Ok(IndexOutcome::Updated)
            }
            None => {
                docs.push((id.to_owned(), document.clone()));
                Ok(IndexOutcome::Created)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn outcome_from_tag() {
        assert_eq!(IndexOutcome::from_tag("created"), IndexOutcome::Created);
        assert_eq!(IndexOutcome::from_tag("updated"), IndexOutcome::Updated);
        assert_eq!(
            IndexOutcome::from_tag("noop"),
            IndexOutcome::Other("noop".to_owned())
        );
    }

    #[test]
    fn outcome_success() {
        assert!(IndexOutcome::Created.is_success());
        assert!(IndexOutcome::Updated.is_success());
        assert!(!IndexOutcome::Other("noop".to_owned()).is_success());
    }

    #[tokio::test]
    async fn in_memory_upsert_semantics() {
        let sink = InMemorySink::new();
        let first = sink
            .index_document("idx", "a", &doc(json!({"v": 1})))
            .await
            .unwrap();
        let second = sink
            .index_document("idx", "a", &doc(json!({"v": 2})))
            .await
            .unwrap();

        assert_eq!(first, IndexOutcome::Created);
        assert_eq!(second, IndexOutcome::Updated);
        let docs = sink.documents("idx");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].1["v"], 2);
        assert_eq!(sink.index_calls(), 2);
    }

    #[tokio::test]
    async fn in_memory_failing_and_noop_ids() {
        let sink = InMemorySink::new().with_failing_id("bad").with_noop_id("same");
        assert!(sink.index_document("idx", "bad", &Map::new()).await.is_err());
        assert_eq!(
            sink.index_document("idx", "same", &Map::new()).await.unwrap(),
            IndexOutcome::Other("noop".to_owned())
        );
        assert!(sink.documents("idx").is_empty());
    }

    #[tokio::test]
    async fn in_memory_index_lifecycle() {
        let sink = InMemorySink::new();
        assert!(!sink.index_exists("idx").await.unwrap());
        sink.create_index("idx").await.unwrap();
        sink.create_index("idx").await.unwrap();
        assert!(sink.index_exists("idx").await.unwrap());
    }

    #[tokio::test]
    async fn in_memory_failing_index_creation() {
        let sink = InMemorySink::new().with_failing_index_creation();
        let err = sink.create_index("idx").await.unwrap_err();
        assert!(matches!(err, IngestError::IndexCreation { .. }));
    }

    #[tokio::test]
    async fn elasticsearch_connect_rejects_invalid_config() {
        let config = SinkConfig {
            port: 0,
            ..Default::default()
        };
        let err = ElasticsearchSink::connect(&config).await.err().unwrap();
        assert!(matches!(err, IngestError::Config { .. }));
    }

    #[tokio::test]
    async fn elasticsearch_connect_unreachable_is_connection_error() {
        // Port 1 on loopback is closed on any sane test host.
        let config = SinkConfig {
            host: "127.0.0.1".to_owned(),
            port: 1,
            timeout_secs: 2,
            ..Default::default()
        };
        let err = ElasticsearchSink::connect(&config).await.err().unwrap();
        assert!(matches!(err, IngestError::Connection(_)));
    }
}
