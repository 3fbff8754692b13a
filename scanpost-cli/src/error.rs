//! CLI-specific error types and exit code mapping

use scanpost_core::error::ScanpostError;
use scanpost_nuclei::NucleiError;
use scanpost_sink::IngestError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// `exit_code()` maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from scanpost-core.
    #[error("{0}")]
    Core(#[from] ScanpostError),

    /// Scan job failed.
    #[error("scan error: {0}")]
    Scan(String),

    /// Indexing failed or was incomplete.
    #[error("ingest error: {0}")]
    Ingest(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                         |
    /// |------|---------------------------------|
    /// | 0    | Success                         |
    /// | 1    | General / command error         |
    /// | 2    | Configuration error             |
    /// | 4    | Scan or ingestion failure       |
    /// | 10   | IO error                        |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(ScanpostError::Config(_)) => 2,
            Self::Scan(_) | Self::Ingest(_) => 4,
            Self::Core(ScanpostError::Scan(_) | ScanpostError::Sink(_)) => 4,
            Self::Io(_) | Self::Core(ScanpostError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<IngestError> for CliError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Config { .. } => Self::Config(e.to_string()),
            IngestError::Io { .. } => Self::Core(e.into()),
            other => Self::Ingest(other.to_string()),
        }
    }
}

impl From<NucleiError> for CliError {
    fn from(e: NucleiError) -> Self {
        match e {
            NucleiError::Config { .. } => Self::Config(e.to_string()),
            NucleiError::Io { .. } => Self::Core(e.into()),
            other => Self::Scan(other.to_string()),
        }
    }
}
