//! Ingestion entry point.
//!
//! Resolves an [`IngestInput`] into a [`DocumentSet`], makes sure the target
//! index exists and hands the documents to the uploader. Index setup happens
//! before any input is read, so a store problem is reported without touching
//! the documents.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use scanpost_core::metrics::{LABEL_INDEX, SINK_INDICES_CREATED_TOTAL};

use crate::client::{ElasticsearchSink, SearchSink};
use crate::config::SinkConfig;
use crate::error::IngestError;
use crate::upload::{DocumentSet, UploadResult, object_or_invalid, timestamp_key, upload};

/// Field used as the document key for single-document input.
const ALERT_ID_FIELD: &str = "AlertID";

/// What to ingest.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestInput {
    /// A `.json` file holding an array or an object of documents
    File(PathBuf),
    /// One document
    Single(Map<String, Value>),
    /// Documents already in memory
    Documents(DocumentSet),
}

impl IngestInput {
    /// Wraps a single JSON value: objects become [`IngestInput::Single`].
    ///
    /// # Errors
    ///
    /// `IngestError::InvalidInput` for non-object values.
    pub fn single(value: Value) -> Result<Self, IngestError> {
        object_or_invalid(value).map(Self::Single)
    }

    /// Resolves the input into documents.
    async fn resolve(self) -> Result<DocumentSet, IngestError> {
        match self {
            Self::File(path) => load_documents(&path).await,
            Self::Single(document) => {
                let key = alert_key(&document).unwrap_or_else(timestamp_key);
                Ok(DocumentSet::Keyed(vec![(key, Value::Object(document))]))
            }
            Self::Documents(documents) => Ok(documents),
        }
    }
}

/// Reads a `.json` file of documents.
///
/// # Errors
///
/// - `IngestError::UnsupportedFormat`: extension other than `.json`
/// - `IngestError::Io`: the file cannot be read
/// - `IngestError::Load`: the content is not JSON
/// - `IngestError::InvalidInput`: the JSON is neither an array nor an object
pub async fn load_documents(path: &Path) -> Result<DocumentSet, IngestError> {
    let shown = path.display().to_string();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if !extension.eq_ignore_ascii_case("json") {
        return Err(IngestError::UnsupportedFormat {
            path: shown,
            extension: format!(".{extension}"),
        });
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IngestError::Io {
            path: shown.clone(),
            source,
        })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| IngestError::Load {
        path: shown.clone(),
        reason: e.to_string(),
    })?;

    debug!(path = %shown, "loaded documents file");
    DocumentSet::from_value(value)
}

/// Creates `index` unless it already exists.
///
/// # Errors
///
/// `IngestError::IndexCreation` when the check or the creation fails.
pub async fn ensure_index<S: SearchSink>(sink: &S, index: &str) -> Result<(), IngestError> {
    if sink.index_exists(index).await? {
        debug!(index, "index exists");
        return Ok(());
    }

    sink.create_index(index).await?;
    metrics::counter!(SINK_INDICES_CREATED_TOTAL, LABEL_INDEX => index.to_owned()).increment(1);
    info!(index, "created index");
    Ok(())
}

/// Ingests `input` into `index` through `sink`.
///
/// # Errors
///
/// Index setup and input resolution errors. Per-document failures are
/// reported in the returned [`UploadResult`].
pub async fn ingest<S: SearchSink>(
    sink: &S,
    input: IngestInput,
    index: &str,
) -> Result<UploadResult, IngestError> {
    ensure_index(sink, index).await?;

    let documents = input.resolve().await?;
    let result = upload(sink, index, documents).await;

    info!(
        index,
        successful = result.successful,
        failed = result.failed,
        "ingestion finished"
    );
    Ok(result)
}

/// Connects to the store described by `config`, then runs [`ingest`].
///
/// # Errors
///
/// `IngestError::Connection` or `IngestError::Config` from connecting, then
/// anything [`ingest`] returns.
pub async fn ingest_at(
    config: &SinkConfig,
    input: IngestInput,
    index: &str,
) -> Result<UploadResult, IngestError> {
    let sink = ElasticsearchSink::connect(config).await?;
    ingest(&sink, input, index).await
}

fn alert_key(document: &Map<String, Value>) -> Option<String> {
    match document.get(ALERT_ID_FIELD)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
