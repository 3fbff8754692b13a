//! Sink error type.
//!
//! [`IngestError`] covers everything that can go wrong between an input and
//! the search store. `From<IngestError> for ScanpostError` lets callers bubble
//! it up with `?`.
//!
//! # Categories
//!
//! - **Fatal, before any document**: `Connection`, `IndexCreation`,
//!   `UnsupportedFormat`, `InvalidInput`, `Load`, `Io`, `Config`
//! - **Per document**: `Request` (recorded in the upload result, never aborts a batch)

use scanpost_core::error::{ConfigError, ScanpostError, SinkError};

/// Sink domain error.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Store unreachable
    #[error("connection error: {0}")]
    Connection(String),

    /// Index existence check or creation failed
    #[error("index creation error: {index}: {reason}")]
    IndexCreation {
        /// Index name
        index: String,
        /// Failure reason
        reason: String,
    },

    /// Input file has an extension other than `.json`
    #[error("unsupported file format: {path}: '{extension}' (only .json is supported)")]
    UnsupportedFormat {
        /// Input file path
        path: String,
        /// Offending extension
        extension: String,
    },

    /// Input is neither a sequence nor a mapping of documents
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Input file is not valid JSON
    #[error("load error: {path}: {reason}")]
    Load {
        /// Input file path
        path: String,
        /// Parse failure reason
        reason: String,
    },

    /// File I/O error
    #[error("io error: {path}: {source}")]
    Io {
        /// Related path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// A single store request failed
    #[error("request error: {0}")]
    Request(String),

    /// Sink configuration error
    #[error("config error: {field}: {reason}")]
    Config {
        /// Field name
        field: String,
        /// Failure reason
        reason: String,
    },
}

impl From<IngestError> for ScanpostError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Connection(msg) => ScanpostError::Sink(SinkError::Connection(msg)),
            IngestError::IndexCreation { index, reason } => {
                ScanpostError::Sink(SinkError::IndexCreation(format!("{index}: {reason}")))
            }
            err @ (IngestError::UnsupportedFormat { .. }
            | IngestError::InvalidInput(_)
            | IngestError::Load { .. }) => {
                ScanpostError::Sink(SinkError::InvalidInput(err.to_string()))
            }
            IngestError::Io { source, .. } => ScanpostError::Io(source),
            IngestError::Request(msg) => ScanpostError::Sink(SinkError::Request(msg)),
            IngestError::Config { field, reason } => {
                ScanpostError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let err = IngestError::UnsupportedFormat {
            path: "findings.csv".to_owned(),
            extension: ".csv".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("findings.csv"));
        assert!(msg.contains(".csv"));
    }

    #[test]
    fn index_creation_display() {
        let err = IngestError::IndexCreation {
            index: "artifact_nuclei".to_owned(),
            reason: "HTTP 403".to_owned(),
        };
        assert!(err.to_string().contains("artifact_nuclei"));
    }

    #[test]
    fn converts_connection() {
        let err: ScanpostError = IngestError::Connection("refused".to_owned()).into();
        assert!(matches!(err, ScanpostError::Sink(SinkError::Connection(_))));
    }

    #[test]
    fn converts_input_errors_to_invalid_input() {
        for err in [
            IngestError::InvalidInput("string".to_owned()),
            IngestError::Load {
                path: "a.json".to_owned(),
                reason: "eof".to_owned(),
            },
            IngestError::UnsupportedFormat {
                path: "a.yaml".to_owned(),
                extension: ".yaml".to_owned(),
            },
        ] {
            let converted: ScanpostError = err.into();
            assert!(matches!(
                converted,
                ScanpostError::Sink(SinkError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn converts_config() {
        let err: ScanpostError = IngestError::Config {
            field: "port".to_owned(),
            reason: "zero".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            ScanpostError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn converts_io() {
        let err: ScanpostError = IngestError::Io {
            path: "/tmp/x.json".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(matches!(err, ScanpostError::Io(_)));
    }
}
