//! Metric names.
//!
//! Every crate uses these constants with the `metrics` macros so names stay
//! consistent in one place.
//!
//! # Naming
//!
//! - prefix: `scanpost_`
//! - component: `sink_`, `nuclei_`
//! - suffix: `_total` for counters, `_seconds` for durations
//!
//! ```ignore
//! metrics::counter!(scanpost_core::metrics::SINK_DOCUMENTS_INDEXED_TOTAL).increment(1);
//! ```

// ─── label keys ────────────────────────────────────────────────────

/// Index name label key
pub const LABEL_INDEX: &str = "index";

/// Severity label key (info, low, medium, high, critical, unknown)
pub const LABEL_SEVERITY: &str = "severity";

// ─── sink ──────────────────────────────────────────────────────────

/// Sink: documents accepted by the store (counter, label: index)
pub const SINK_DOCUMENTS_INDEXED_TOTAL: &str = "scanpost_sink_documents_indexed_total";

/// Sink: documents rejected or errored (counter, label: index)
pub const SINK_DOCUMENTS_FAILED_TOTAL: &str = "scanpost_sink_documents_failed_total";

/// Sink: indices created on demand (counter, label: index)
pub const SINK_INDICES_CREATED_TOTAL: &str = "scanpost_sink_indices_created_total";

// ─── nuclei ────────────────────────────────────────────────────────

/// Nuclei: scans launched (counter)
pub const NUCLEI_SCANS_STARTED_TOTAL: &str = "scanpost_nuclei_scans_started_total";

/// Nuclei: jobs finished with status Complete (counter)
pub const NUCLEI_SCANS_COMPLETED_TOTAL: &str = "scanpost_nuclei_scans_completed_total";

/// Nuclei: jobs finished with status Failed (counter)
pub const NUCLEI_SCANS_FAILED_TOTAL: &str = "scanpost_nuclei_scans_failed_total";

/// Nuclei: scanner processes that exited non-zero (counter)
pub const NUCLEI_NONZERO_EXIT_TOTAL: &str = "scanpost_nuclei_nonzero_exit_total";

/// Nuclei: findings read from scanner output (counter, label: severity)
pub const NUCLEI_FINDINGS_TOTAL: &str = "scanpost_nuclei_findings_total";

/// Nuclei: wall-clock duration of the scanner process (histogram, seconds)
pub const NUCLEI_SCAN_DURATION_SECONDS: &str = "scanpost_nuclei_scan_duration_seconds";
