//! Runner configuration
//!
//! [`NucleiConfig`] is derived from core's [`NucleiSection`](scanpost_core::config::NucleiSection)
//! plus the target index from the `[sink]` section.
//!
//! ```
//! use scanpost_nuclei::NucleiConfigBuilder;
//!
//! let config = NucleiConfigBuilder::new()
//!     .binary_path("/opt/nuclei/nuclei")
//!     .templates_dir("/opt/nuclei/templates")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.index, "artifact_nuclei");
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::NucleiError;

/// Index that scan findings are written to.
pub const DEFAULT_INDEX: &str = "artifact_nuclei";

/// Scan runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NucleiConfig {
    /// Scanner binary
    pub binary_path: PathBuf,
    /// Template directory (`None` leaves template selection to the scanner)
    pub templates_dir: Option<PathBuf>,
    /// Where per-job target lists are written
    pub scratch_dir: PathBuf,
    /// `-timeout` value (seconds)
    pub timeout_secs: u64,
    /// `-mhe` value
    pub max_host_errors: u32,
    /// Index receiving findings
    pub index: String,
}

impl Default for NucleiConfig {
    fn default() -> Self {
        Self::from_core(&scanpost_core::config::NucleiSection::default())
    }
}

impl NucleiConfig {
    /// Builds the runner config from core's `[nuclei]` section.
    ///
    /// The index is [`DEFAULT_INDEX`]; callers holding a `[sink]` section
    /// override it with [`NucleiConfig::with_index`].
    pub fn from_core(core: &scanpost_core::config::NucleiSection) -> Self {
        let templates_dir = if core.templates_dir.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&core.templates_dir))
        };

        Self {
            binary_path: PathBuf::from(&core.binary_path),
            templates_dir,
            scratch_dir: PathBuf::from(&core.scratch_dir),
            timeout_secs: core.timeout_secs,
            max_host_errors: core.max_host_errors,
            index: DEFAULT_INDEX.to_owned(),
        }
    }

    /// Replaces the target index.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Validates field values.
    pub fn validate(&self) -> Result<(), NucleiError> {
        if self.binary_path.as_os_str().is_empty() {
            return Err(NucleiError::Config {
                field: "binary_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.scratch_dir.as_os_str().is_empty() {
            return Err(NucleiError::Config {
                field: "scratch_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.timeout_secs == 0 {
            return Err(NucleiError::Config {
                field: "timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_host_errors == 0 {
            return Err(NucleiError::Config {
                field: "max_host_errors".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        // Elasticsearch rejects index names with uppercase letters
        if self.index.is_empty() || self.index.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(NucleiError::Config {
                field: "index".to_owned(),
                reason: format!("'{}' must be a non-empty lowercase name", self.index),
            });
        }

        Ok(())
    }
}

/// [`NucleiConfig`] builder.
#[derive(Default)]
pub struct NucleiConfigBuilder {
    config: NucleiConfig,
}

impl NucleiConfigBuilder {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scanner binary.
    pub fn binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.binary_path = path.into();
        self
    }

    /// Sets the template directory.
    pub fn templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.templates_dir = Some(dir.into());
        self
    }

    /// Leaves template selection to the scanner.
    pub fn no_templates_dir(mut self) -> Self {
        self.config.templates_dir = None;
        self
    }

    /// Sets the scratch directory.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    /// Sets the `-timeout` value.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Sets the `-mhe` value.
    pub fn max_host_errors(mut self, count: u32) -> Self {
        self.config.max_host_errors = count;
        self
    }

    /// Sets the target index.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.config.index = index.into();
        self
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<NucleiConfig, NucleiError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
