//! `scanpost scan` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use scanpost_nuclei::{
    BestEffort, JobRecord, JobStatus, NucleiConfig, RunOutcome, ScanRunner, TokioScannerProcess,
};
use scanpost_sink::{ElasticsearchSink, SinkConfig};

use crate::cli::ScanArgs;
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
///
/// Runs the job, renders the outcome and optionally writes the job record
/// back. A failed job maps to `CliError::Scan` after the report is written.
pub async fn execute(
    args: ScanArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let loaded = load_config(config_path).await?;
    let config = &loaded.config;

    let nuclei_config = NucleiConfig::from_core(&config.nuclei).with_index(&config.sink.index);
    nuclei_config.validate()?;

    let mut job = JobRecord::load(&args.job).await?;
    info!(job = %args.job.display(), targets = job.population.len(), "starting scan job");

    let sink = if args.no_ingest {
        None
    } else {
        connect_sink(&SinkConfig::from_core(&config.sink)).await
    };

    let runner = ScanRunner::new(nuclei_config, TokioScannerProcess::new(), sink);
    let outcome = runner.run(&mut job).await;

    if args.write_back {
        job.save(&args.job).await?;
        info!(job = %args.job.display(), "job record written back");
    }

    let report = ScanReport::new(&args.job, &job, outcome, runner.config().index.clone());
    writer.render(&report)?;

    if report.outcome.status == JobStatus::Failed {
        return Err(CliError::Scan(
            job.error.unwrap_or_else(|| "job failed".to_owned()),
        ));
    }

    Ok(())
}

/// An unreachable sink does not stop the scan; findings stay on disk.
async fn connect_sink(config: &SinkConfig) -> Option<ElasticsearchSink> {
    match ElasticsearchSink::connect(config).await {
        Ok(sink) => Some(sink),
        Err(e) => {
            warn!(error = %e, url = %config.base_url(), "search sink unavailable, findings will not be indexed");
            None
        }
    }
}

#[derive(Serialize)]
pub struct ScanReport {
    pub job: String,
    pub unique_id: Option<String>,
    pub index: String,
    pub response_path: String,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanReport {
    fn new(job_path: &Path, job: &JobRecord, outcome: RunOutcome, index: String) -> Self {
        Self {
            job: job_path.display().to_string(),
            unique_id: job.unique_id.clone(),
            index,
            response_path: job.response_path.display().to_string(),
            outcome,
            error: job.error.clone(),
        }
    }
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scan job: {}", self.job.bold())?;
        let status = match self.outcome.status {
            JobStatus::Complete => "COMPLETE".green().bold(),
            JobStatus::Failed => "FAILED".red().bold(),
            other => other.to_string().to_uppercase().yellow().bold(),
        };
        writeln!(w, "  Status: {status}")?;
        if let Some(ref id) = self.unique_id {
            writeln!(w, "  Unique ID: {id}")?;
        }
        writeln!(w, "  Findings file: {}", self.response_path)?;
        if let Some(ref error) = self.error {
            writeln!(w, "  Error: {}", error.red())?;
        }

        if let Some(exit) = self.outcome.exit {
            let code = exit
                .code
                .map_or_else(|| "unknown".to_owned(), |c| c.to_string());
            writeln!(w, "  Scanner exit code: {code} ({} output lines)", exit.lines)?;
        }

        match self.outcome.ingestion {
            Some(BestEffort::Indexed(ref result)) => {
                writeln!(
                    w,
                    "  Indexed into {}: {} successful, {} failed",
                    self.index.bold(),
                    result.successful,
                    result.failed
                )?;
                for err in &result.errors {
                    writeln!(w, "    {}", err.yellow())?;
                }
            }
            Some(BestEffort::Skipped { ref reason }) => {
                writeln!(w, "  Indexing skipped: {}", reason.yellow())?;
            }
            None => {}
        }

        if let Some(ref severities) = self.outcome.severities {
            writeln!(w)?;
            writeln!(w, "  {:<10} {:>6}", "SEVERITY".bold(), "COUNT".bold())?;
            for (name, count) in severities.iter() {
                writeln!(w, "  {name:<10} {count:>6}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanpost_nuclei::ScannerExit;
    use scanpost_sink::UploadResult;

    fn report(status: JobStatus, ingestion: Option<BestEffort>) -> ScanReport {
        ScanReport {
            job: "job.json".to_owned(),
            unique_id: Some("9000042".to_owned()),
            index: "artifact_nuclei".to_owned(),
            response_path: "/tmp/out.json".to_owned(),
            outcome: RunOutcome {
                status,
                exit: Some(ScannerExit {
                    code: Some(0),
                    lines: 12,
                }),
                ingestion,
                severities: None,
            },
            error: None,
        }
    }

    fn text(report: &ScanReport) -> String {
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn text_shows_indexing_counts() {
        let result = UploadResult {
            successful: 3,
            failed: 1,
            errors: vec!["Document k failed: result=noop".to_owned()],
        };
        let out = text(&report(JobStatus::Complete, Some(BestEffort::Indexed(result))));
        assert!(out.contains("COMPLETE"));
        assert!(out.contains("3 successful, 1 failed"));
        assert!(out.contains("Document k failed"));
        assert!(out.contains("9000042"));
    }

    #[test]
    fn text_shows_skip_reason() {
        let skipped = BestEffort::Skipped {
            reason: "no search sink configured".to_owned(),
        };
        let out = text(&report(JobStatus::Complete, Some(skipped)));
        assert!(out.contains("Indexing skipped: "));
        assert!(out.contains("no search sink configured"));
    }

    #[test]
    fn json_flattens_outcome() {
        let value = serde_json::to_value(report(JobStatus::Failed, None)).unwrap();
        assert_eq!(value["status"], "Failed");
        assert_eq!(value["exit"]["code"], 0);
        assert_eq!(value["unique_id"], "9000042");
        assert!(value.get("error").is_none());
    }
}
