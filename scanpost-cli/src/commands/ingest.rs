//! `scanpost ingest` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use scanpost_sink::{InMemorySink, IngestInput, SinkConfig, UploadResult, ingest, ingest_at};

use crate::cli::IngestArgs;
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `ingest` command.
///
/// Any per-document failure turns into `CliError::Ingest` once the report
/// has been written.
pub async fn execute(
    args: IngestArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let loaded = load_config(config_path).await?;
    let index = args
        .index
        .unwrap_or_else(|| loaded.config.sink.index.clone());
    let input = IngestInput::File(args.file.clone());

    info!(file = %args.file.display(), index = %index, dry_run = args.dry_run, "ingesting file");

    let result = if args.dry_run {
        ingest(&InMemorySink::new(), input, &index).await?
    } else {
        let sink_config = SinkConfig::from_core(&loaded.config.sink);
        sink_config.validate()?;
        ingest_at(&sink_config, input, &index).await?
    };

    let report = IngestReport {
        file: args.file.display().to_string(),
        index,
        dry_run: args.dry_run,
        result,
    };
    writer.render(&report)?;

    if report.result.failed > 0 {
        return Err(CliError::Ingest(format!(
            "{} of {} documents failed",
            report.result.failed,
            report.result.total()
        )));
    }

    Ok(())
}

#[derive(Serialize)]
pub struct IngestReport {
    pub file: String,
    pub index: String,
    pub dry_run: bool,
    #[serde(flatten)]
    pub result: UploadResult,
}

impl Render for IngestReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(w, "Ingest: {}{mode}", self.file.bold())?;
        writeln!(w, "  Index: {}", self.index)?;
        writeln!(w, "  Successful: {}", self.result.successful.to_string().green())?;
        if self.result.failed > 0 {
            writeln!(w, "  Failed: {}", self.result.failed.to_string().red())?;
            for err in &self.result.errors {
                writeln!(w, "    {}", err.red())?;
            }
        } else {
            writeln!(w, "  Failed: 0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flattens_result() {
        let report = IngestReport {
            file: "docs.json".to_owned(),
            index: "artifact_nuclei".to_owned(),
            dry_run: true,
            result: UploadResult {
                successful: 2,
                failed: 0,
                errors: Vec::new(),
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["successful"], 2);
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["errors"], serde_json::json!([]));
    }

    #[test]
    fn text_lists_failures() {
        let report = IngestReport {
            file: "docs.json".to_owned(),
            index: "i".to_owned(),
            dry_run: false,
            result: UploadResult {
                successful: 1,
                failed: 1,
                errors: vec!["Error indexing document b: boom".to_owned()],
            },
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let out = String::from_utf8(buffer).unwrap();
        assert!(out.contains("Error indexing document b: boom"));
        assert!(!out.contains("dry run"));
    }
}
