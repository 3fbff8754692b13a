//! Sink configuration
//!
//! [`SinkConfig`] is built from core's [`SinkSection`](scanpost_core::config::SinkSection)
//! and validated before any connection is attempted.
//!
//! ```
//! use scanpost_sink::SinkConfigBuilder;
//!
//! let config = SinkConfigBuilder::new()
//!     .host("es.internal")
//!     .port(9243)
//!     .scheme("https")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.base_url(), "https://es.internal:9243");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

const MAX_TIMEOUT_SECS: u64 = 600;

/// Search store location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Hostname or IP
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// `http` or `https`
    pub scheme: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 9200,
            scheme: "http".to_owned(),
            timeout_secs: 30,
        }
    }
}

impl SinkConfig {
    /// Builds the sink config from core's `[sink]` section.
    pub fn from_core(core: &scanpost_core::config::SinkSection) -> Self {
        Self {
            host: core.host.clone(),
            port: core.port,
            scheme: core.scheme.clone(),
            timeout_secs: core.timeout_secs,
        }
    }

    /// Base URL of the store, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Validates field values.
    ///
    /// - `host`: non-empty, no scheme or path
    /// - `port`: non-zero
    /// - `scheme`: `http` or `https`
    /// - `timeout_secs`: 1-600
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.host.trim().is_empty() {
            return Err(IngestError::Config {
                field: "host".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.host.contains("://") || self.host.contains('/') {
            return Err(IngestError::Config {
                field: "host".to_owned(),
                reason: format!("'{}' must be a bare hostname or IP", self.host),
            });
        }

        if self.port == 0 {
            return Err(IngestError::Config {
                field: "port".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.scheme != "http" && self.scheme != "https" {
            return Err(IngestError::Config {
                field: "scheme".to_owned(),
                reason: "must be http or https".to_owned(),
            });
        }

        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(IngestError::Config {
                field: "timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        Ok(())
    }
}

/// [`SinkConfig`] builder.
#[derive(Default)]
pub struct SinkConfigBuilder {
    config: SinkConfig,
}

impl SinkConfigBuilder {
    /// Starts from the defaults (`http://localhost:9200`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the scheme.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    /// Sets the request timeout.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<SinkConfig, IngestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
