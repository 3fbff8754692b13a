#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`NucleiError`)
//! - [`config`]: Runner settings (`NucleiConfig`, builder)
//! - [`job`]: Scheduler job record (`JobRecord`, `JobStatus`, `NucleiArguments`)
//! - [`severity`]: Severity filter and statistics
//! - [`command`]: Scanner command line
//! - [`process`]: Subprocess execution (`ScannerProcess` trait)
//! - [`format`]: Finding enrichment and keying (`FindingFormatter`)
//! - [`runner`]: Job state machine (`ScanRunner`)

pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod job;
pub mod process;
pub mod runner;
pub mod severity;

// --- Public API Re-exports ---

pub use command::NucleiCommand;
pub use config::{DEFAULT_INDEX, NucleiConfig, NucleiConfigBuilder};
pub use error::NucleiError;
pub use format::{FindingFormatter, format_findings, format_findings_value};
pub use job::{JobRecord, JobStatus, NucleiArguments};
pub use process::{ProcessExit, ScannerProcess, TokioScannerProcess};
pub use runner::{BestEffort, RunOutcome, ScanRunner, ScannerExit, generate_unique_id};
pub use severity::{
    SeverityCounts, count_severities, count_severities_value, create_include_severities,
};
