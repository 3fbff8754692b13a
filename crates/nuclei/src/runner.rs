//! Scan runner: drives one job from `Pending` to a terminal state.
//!
//! ```text
//! Pending ──> Running ──> prepare ──> launch ──> ingest (best effort) ──> Complete
//!                 │          │           │
//!                 └──────────┴───────────┴──> Failed (error recorded)
//! ```
//!
//! Anything that goes wrong before the scanner starts fails the job. Once the
//! scanner has run, the job completes regardless of its exit code; indexing
//! problems are logged and surfaced only through [`BestEffort::Skipped`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use scanpost_core::metrics::{
    LABEL_SEVERITY, NUCLEI_FINDINGS_TOTAL, NUCLEI_NONZERO_EXIT_TOTAL, NUCLEI_SCAN_DURATION_SECONDS,
    NUCLEI_SCANS_COMPLETED_TOTAL, NUCLEI_SCANS_FAILED_TOTAL, NUCLEI_SCANS_STARTED_TOTAL,
};
use scanpost_sink::{IngestInput, SearchSink, UploadResult, ingest};

use crate::command::NucleiCommand;
use crate::config::NucleiConfig;
use crate::error::NucleiError;
use crate::format::format_findings;
use crate::job::{JobRecord, JobStatus};
use crate::process::{ProcessExit, ScannerProcess};
use crate::severity::{SeverityCounts, count_severities, create_include_severities};

/// Range of run ids handed to the scheduler.
const UNIQUE_ID_MIN: u64 = 9_000_000;
const UNIQUE_ID_MAX: u64 = 99_999_999;

/// `ExpireDate` format (local time, no zone).
const EXPIRE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Result of a post-scan step that must not fail the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BestEffort {
    /// Findings were handed to the sink
    Indexed(UploadResult),
    /// Indexing did not happen
    Skipped {
        /// Why
        reason: String,
    },
}

impl BestEffort {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Summary of one [`ScanRunner::run`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Terminal status written to the job
    pub status: JobStatus,
    /// Scanner exit, when the scanner ran
    pub exit: Option<ScannerExit>,
    /// Indexing result, when the scanner ran
    pub ingestion: Option<BestEffort>,
    /// Severity counts of the findings file, when it could be read
    pub severities: Option<SeverityCounts>,
}

/// Serializable view of [`ProcessExit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScannerExit {
    /// Exit code, `None` if unknown
    pub code: Option<i32>,
    /// Output lines logged
    pub lines: usize,
}

impl From<ProcessExit> for ScannerExit {
    fn from(exit: ProcessExit) -> Self {
        Self {
            code: exit.code,
            lines: exit.lines,
        }
    }
}

/// What a successful scan produced, before it is written to the job.
struct ScanReport {
    exit: ProcessExit,
    ingestion: BestEffort,
    severities: Option<SeverityCounts>,
}

/// Runs Nuclei jobs.
///
/// `sink` receives the findings; with `None`, indexing is skipped and the job
/// still completes.
pub struct ScanRunner<P, S> {
    config: NucleiConfig,
    process: P,
    sink: Option<S>,
}

impl<P: ScannerProcess, S: SearchSink> ScanRunner<P, S> {
    /// Creates a runner.
    pub fn new(config: NucleiConfig, process: P, sink: Option<S>) -> Self {
        Self {
            config,
            process,
            sink,
        }
    }

    /// Runner configuration.
    pub fn config(&self) -> &NucleiConfig {
        &self.config
    }

    /// Runs `job` and records its terminal state.
    ///
    /// Never returns an error: the outcome is written to `job.status`,
    /// `job.error` and `job.expire_date`. A job without population fails
    /// straight from `Pending` and gets no `expire_date`.
    pub async fn run(&self, job: &mut JobRecord) -> RunOutcome {
        job.error = None;

        if job.population.is_empty() {
            return Self::fail(job, &NucleiError::EmptyPopulation);
        }

        job.status = JobStatus::Running;
        let outcome = match self.execute(job).await {
            Ok(report) => {
                job.status = JobStatus::Complete;
                metrics::counter!(NUCLEI_SCANS_COMPLETED_TOTAL).increment(1);
                info!(unique_id = ?job.unique_id, "nuclei job complete");
                RunOutcome {
                    status: JobStatus::Complete,
                    exit: Some(report.exit.into()),
                    ingestion: Some(report.ingestion),
                    severities: report.severities,
                }
            }
            Err(e) => Self::fail(job, &e),
        };

        job.expire_date = Some(Local::now().format(EXPIRE_DATE_FORMAT).to_string());
        outcome
    }

    fn fail(job: &mut JobRecord, e: &NucleiError) -> RunOutcome {
        error!(error = %e, "nuclei job failed");
        job.status = JobStatus::Failed;
        job.error = Some(e.to_string());
        metrics::counter!(NUCLEI_SCANS_FAILED_TOTAL).increment(1);
        RunOutcome {
            status: JobStatus::Failed,
            exit: None,
            ingestion: None,
            severities: None,
        }
    }

    async fn execute(&self, job: &mut JobRecord) -> Result<ScanReport, NucleiError> {
        let targets = job.targets();
        info!(population = %targets.join(", "), "nuclei population");

        let arguments = job.nuclei_arguments()?;
        let include = create_include_severities(arguments.nuclei_exclude_severity.as_deref());

        let unique_id = generate_unique_id();
        job.unique_id = Some(unique_id.to_string());

        ensure_executable(&self.config.binary_path).await?;

        let target_list = TargetList::write(&self.config.scratch_dir, unique_id, &job.targets()).await?;

        let command = NucleiCommand::build(
            &self.config,
            target_list.path(),
            &job.response_path,
            &include,
            &arguments,
        );
        info!(command = %command, "executing nuclei");

        metrics::counter!(NUCLEI_SCANS_STARTED_TOTAL).increment(1);
        let started = Instant::now();
        let exit = self.process.run(&command).await?;
        metrics::histogram!(NUCLEI_SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        drop(target_list);

        if !exit.success() {
            metrics::counter!(NUCLEI_NONZERO_EXIT_TOTAL).increment(1);
            error!(code = ?exit.code, "nuclei command exited with error code");
        }

        let ingestion = self.ingest_findings(job).await;
        let severities = self.findings_stats(&job.response_path).await;

        Ok(ScanReport {
            exit,
            ingestion,
            severities,
        })
    }

    /// Formats the findings and indexes them. Falls back to indexing the raw
    /// findings file when formatting fails.
    async fn ingest_findings(&self, job: &JobRecord) -> BestEffort {
        let Some(sink) = &self.sink else {
            info!("no search sink configured, skipping upload");
            return BestEffort::skipped("no search sink configured");
        };

        let input = match format_findings(&job.response_path, &job.population).await {
            Ok(documents) => IngestInput::Documents(documents),
            Err(e) => {
                warn!(error = %e, "formatting findings failed, uploading raw findings file");
                IngestInput::File(job.response_path.clone())
            }
        };

        info!(index = %self.config.index, "uploading nuclei findings");
        match ingest(sink, input, &self.config.index).await {
            Ok(result) => BestEffort::Indexed(result),
            Err(e) => {
                warn!(error = %e, "upload of nuclei findings failed");
                BestEffort::skipped(e.to_string())
            }
        }
    }

    async fn findings_stats(&self, path: &Path) -> Option<SeverityCounts> {
        match count_severities(path).await {
            Ok(counts) => {
                for (severity, count) in counts.iter() {
                    metrics::counter!(NUCLEI_FINDINGS_TOTAL, LABEL_SEVERITY => severity.to_owned())
                        .increment(u64::try_from(count).unwrap_or(u64::MAX));
                }
                Some(counts)
            }
            Err(e) => {
                warn!(error = %e, "nuclei stats failed");
                None
            }
        }
    }
}

/// Random run id in `[9000000, 99999999]`, taken from a v4 UUID's random bits.
pub fn generate_unique_id() -> u64 {
    let span = u128::from(UNIQUE_ID_MAX - UNIQUE_ID_MIN + 1);
    let offset = Uuid::new_v4().as_u128() % span;
    // offset < span, which fits in u64
    UNIQUE_ID_MIN + u64::try_from(offset).unwrap_or(0)
}

/// Checks that the scanner binary is a regular file and adds the owner
/// execute bit when it is missing.
async fn ensure_executable(path: &Path) -> Result<(), NucleiError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(NucleiError::BinaryNotFound(path.display().to_string())),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = metadata.permissions();
        let mode = permissions.mode();
        if mode & 0o100 == 0 {
            permissions.set_mode(mode | 0o100);
            tokio::fs::set_permissions(path, permissions)
                .await
                .map_err(|source| NucleiError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            info!(path = %path.display(), "added execute permission");
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}

/// Per-job target list, removed when dropped.
struct TargetList {
    path: PathBuf,
}

impl TargetList {
    async fn write(scratch_dir: &Path, unique_id: u64, targets: &[&str]) -> Result<Self, NucleiError> {
        let path = scratch_dir.join(format!("nuclei_list_{unique_id}.txt"));
        let mut content = String::new();
        for target in targets {
            content.push_str(target.trim());
            content.push('\n');
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|source| NucleiError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TargetList {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove target list");
        }
    }
}
