//! Error types shared across the workspace.

/// Top-level scanpost error.
///
/// Domain crates define their own error enums and convert into this one,
/// so the CLI only ever has to deal with a single type.
#[derive(Debug, thiserror::Error)]
pub enum ScanpostError {
    /// Configuration problem
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Search sink (indexing) problem
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Scanner execution problem
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config file is not valid TOML for the expected layout
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds a value outside its allowed range
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Search sink errors, in the coarse form the CLI reports them.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Sink unreachable
    #[error("connection failed: {0}")]
    Connection(String),

    /// Index could not be checked or created
    #[error("index creation failed: {0}")]
    IndexCreation(String),

    /// Input could not be turned into documents
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A request to the store failed
    #[error("request failed: {0}")]
    Request(String),
}

/// Scanner execution errors, in the coarse form the CLI reports them.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Scanner binary missing
    #[error("scanner binary not found: {0}")]
    BinaryNotFound(String),

    /// Scanner could not be prepared or launched
    #[error("scan failed: {0}")]
    Failed(String),

    /// Scanner output could not be read
    #[error("findings unreadable: {0}")]
    Findings(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: ScanpostError = ConfigError::InvalidValue {
            field: "sink.port".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, ScanpostError::Config(_)));
        assert!(err.to_string().contains("sink.port"));
    }

    #[test]
    fn sink_error_display() {
        let err = SinkError::Connection("localhost:9200 refused".to_owned());
        assert_eq!(err.to_string(), "connection failed: localhost:9200 refused");
    }

    #[test]
    fn scan_error_converts_to_top_level() {
        let err: ScanpostError = ScanError::BinaryNotFound("/opt/nuclei".to_owned()).into();
        assert!(matches!(err, ScanpostError::Scan(ScanError::BinaryNotFound(_))));
        assert!(err.to_string().contains("/opt/nuclei"));
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ScanpostError = io.into();
        assert!(matches!(err, ScanpostError::Io(_)));
    }
}
