//! Nuclei runner error type.
//!
//! [`NucleiError`] is what can stop a scan job. Everything raised before the
//! scanner is launched fails the job; errors from ingestion are logged by the
//! runner and never reach the job record.

use scanpost_core::error::{ConfigError, ScanError, ScanpostError};
use scanpost_sink::IngestError;

/// Nuclei domain error.
#[derive(Debug, thiserror::Error)]
pub enum NucleiError {
    /// The job has no assets to scan
    #[error("Nuclei has no population")]
    EmptyPopulation,

    /// Invalid configuration or job arguments
    #[error("config error: {field}: {reason}")]
    Config {
        /// Field name
        field: String,
        /// Failure reason
        reason: String,
    },

    /// Scanner binary missing or not a regular file
    #[error("No such file or directory: '{0}'")]
    BinaryNotFound(String),

    /// File I/O error
    #[error("io error: {path}: {source}")]
    Io {
        /// Related path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Findings file is not a JSON array
    #[error("findings parse error: {path}: {reason}")]
    FindingsParse {
        /// Findings file path
        path: String,
        /// Failure reason
        reason: String,
    },

    /// Scanner process could not be started
    #[error("failed to launch scanner: {0}")]
    Spawn(String),

    /// Indexing failed
    #[error(transparent)]
    Sink(#[from] IngestError),
}

impl From<NucleiError> for ScanpostError {
    fn from(err: NucleiError) -> Self {
        match err {
            NucleiError::Config { field, reason } => {
                ScanpostError::Config(ConfigError::InvalidValue { field, reason })
            }
            NucleiError::BinaryNotFound(path) => ScanpostError::Scan(ScanError::BinaryNotFound(path)),
            NucleiError::Io { source, .. } => ScanpostError::Io(source),
            err @ NucleiError::FindingsParse { .. } => {
                ScanpostError::Scan(ScanError::Findings(err.to_string()))
            }
            err @ (NucleiError::EmptyPopulation | NucleiError::Spawn(_)) => {
                ScanpostError::Scan(ScanError::Failed(err.to_string()))
            }
            NucleiError::Sink(inner) => inner.into(),
        }
    }
}
