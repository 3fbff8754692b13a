//! `scanpost stats` command handler

use std::io::Write;

use serde::Serialize;

use scanpost_nuclei::{SeverityCounts, count_severities};

use crate::cli::StatsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `stats` command.
pub async fn execute(args: StatsArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let severities = count_severities(&args.file).await?;
    let report = StatsReport {
        file: args.file.display().to_string(),
        total: severities.total(),
        severities,
    };
    writer.render(&report)?;
    Ok(())
}

#[derive(Serialize)]
pub struct StatsReport {
    pub file: String,
    pub total: usize,
    pub severities: SeverityCounts,
}

impl Render for StatsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Findings: {}", self.file.bold())?;
        writeln!(w, "{:<10} {:>6}", "SEVERITY".bold(), "COUNT".bold())?;
        for (name, count) in self.severities.iter() {
            let line = format!("{name:<10} {count:>6}");
            match name {
                "critical" | "high" if count > 0 => writeln!(w, "{}", line.red())?,
                "medium" if count > 0 => writeln!(w, "{}", line.yellow())?,
                _ => writeln!(w, "{line}")?,
            }
        }
        writeln!(w, "{:<10} {:>6}", "total", self.total)?;
        Ok(())
    }
}
