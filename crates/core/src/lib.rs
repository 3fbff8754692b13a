#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- re-exports ---

pub use error::{ConfigError, ScanError, ScanpostError, SinkError};

pub use config::{GeneralConfig, NucleiSection, ScanpostConfig, SinkSection};

pub use types::{Asset, Severity};
