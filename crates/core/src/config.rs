//! Configuration: `scanpost.toml` parsing and runtime settings.
//!
//! [`ScanpostConfig`] is the top-level structure; each crate reads only its
//! own section.
//!
//! # Load order
//! 1. CLI arguments (highest priority, applied by the binary)
//! 2. Environment variables (`SCANPOST_SINK_HOST=es.internal`)
//! 3. Config file (`scanpost.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), scanpost_core::error::ScanpostError> {
//! use scanpost_core::config::ScanpostConfig;
//!
//! // file + env overrides
//! let config = ScanpostConfig::load("scanpost.toml").await?;
//!
//! // straight from a TOML string
//! let config = ScanpostConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScanpostError};

/// Accepted sink URL schemes.
const VALID_SCHEMES: [&str; 2] = ["http", "https"];

/// scanpost configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanpostConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Search sink settings
    #[serde(default)]
    pub sink: SinkSection,
    /// Nuclei scanner settings
    #[serde(default)]
    pub nuclei: NucleiSection,
}

impl ScanpostConfig {
    /// Loads a TOML file and applies environment overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScanpostError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScanpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScanpostError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ScanpostError> {
        toml::from_str(toml_str).map_err(|e| {
            ScanpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides fields from the environment.
    ///
    /// Naming: `SCANPOST_{SECTION}_{FIELD}`, e.g. `SCANPOST_SINK_PORT=9201`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCANPOST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCANPOST_GENERAL_LOG_FORMAT");

        // Sink
        override_string(&mut self.sink.host, "SCANPOST_SINK_HOST");
        override_u16(&mut self.sink.port, "SCANPOST_SINK_PORT");
        override_string(&mut self.sink.scheme, "SCANPOST_SINK_SCHEME");
        override_u64(&mut self.sink.timeout_secs, "SCANPOST_SINK_TIMEOUT_SECS");
        override_string(&mut self.sink.index, "SCANPOST_SINK_INDEX");

        // Nuclei
        override_string(&mut self.nuclei.binary_path, "SCANPOST_NUCLEI_BINARY_PATH");
        override_string(
            &mut self.nuclei.templates_dir,
            "SCANPOST_NUCLEI_TEMPLATES_DIR",
        );
        override_string(&mut self.nuclei.scratch_dir, "SCANPOST_NUCLEI_SCRATCH_DIR");
        override_u64(
            &mut self.nuclei.timeout_secs,
            "SCANPOST_NUCLEI_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.nuclei.max_host_errors,
            "SCANPOST_NUCLEI_MAX_HOST_ERRORS",
        );
    }

    /// Validates field values.
    pub fn validate(&self) -> Result<(), ScanpostError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.sink.host.trim().is_empty() {
            return Err(invalid("sink.host", "must not be empty".to_owned()));
        }

        if self.sink.port == 0 {
            return Err(invalid("sink.port", "must be greater than 0".to_owned()));
        }

        if !VALID_SCHEMES.contains(&self.sink.scheme.as_str()) {
            return Err(invalid(
                "sink.scheme",
                format!("must be one of: {}", VALID_SCHEMES.join(", ")),
            ));
        }

        if self.sink.timeout_secs == 0 {
            return Err(invalid(
                "sink.timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.sink.index.trim().is_empty() {
            return Err(invalid("sink.index", "must not be empty".to_owned()));
        }

        if self.nuclei.binary_path.trim().is_empty() {
            return Err(invalid(
                "nuclei.binary_path",
                "must not be empty".to_owned(),
            ));
        }

        if self.nuclei.timeout_secs == 0 {
            return Err(invalid(
                "nuclei.timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.nuclei.max_host_errors == 0 {
            return Err(invalid(
                "nuclei.max_host_errors",
                "must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> ScanpostError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Search sink location and target index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    /// Store hostname or IP
    pub host: String,
    /// Store HTTP port
    pub port: u16,
    /// `http` or `https`
    pub scheme: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
    /// Index that scan findings are written to
    pub index: String,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 9200,
            scheme: "http".to_owned(),
            timeout_secs: 30,
            index: "artifact_nuclei".to_owned(),
        }
    }
}

/// Nuclei scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NucleiSection {
    /// Scanner binary
    pub binary_path: String,
    /// Template directory passed with `-templates` (empty = scanner default)
    pub templates_dir: String,
    /// Directory for per-job target list files
    pub scratch_dir: String,
    /// Per-host timeout passed with `-timeout` (seconds)
    pub timeout_secs: u64,
    /// Max errors per host before it is skipped, passed with `-mhe`
    pub max_host_errors: u32,
}

impl Default for NucleiSection {
    fn default() -> Self {
        Self {
            binary_path: "modules/Nuclei/dependencies/nuclei".to_owned(),
            templates_dir: "modules/Nuclei/dependencies/nuclei-templates".to_owned(),
            scratch_dir: std::env::temp_dir().display().to_string(),
            timeout_secs: 1,
            max_host_errors: 1,
        }
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
