#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`IngestError`)
//! - [`config`]: Sink location (`SinkConfig`, builder)
//! - [`client`]: Store interface (`SearchSink` trait, `ElasticsearchSink`, `InMemorySink`)
//! - [`sanitize`]: Document cleanup before indexing
//! - [`upload`]: Per-document indexing with failure accounting (`DocumentSet`, `UploadResult`)
//! - [`ingest`]: Entry point (`IngestInput`, `ingest`, `ingest_at`)
//!
//! # Flow
//!
//! ```text
//! IngestInput --> ensure_index --> DocumentSet --> upload --> sanitize --> SearchSink
//!                                                    |
//!                                               UploadResult
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod sanitize;
pub mod upload;

// --- Public API Re-exports ---

pub use client::{ElasticsearchSink, InMemorySink, IndexOutcome, SearchSink};
pub use config::{SinkConfig, SinkConfigBuilder};
pub use error::IngestError;
pub use ingest::{IngestInput, ensure_index, ingest, ingest_at, load_documents};
pub use sanitize::{RULE_TEXT_FIELDS, sanitize, sanitize_value};
pub use upload::{DocumentSet, UploadResult, upload, upload_value};
