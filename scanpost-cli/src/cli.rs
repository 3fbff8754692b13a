//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// scanpost -- run Nuclei scan jobs and index their findings.
///
/// Use `scanpost <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "scanpost", version, about, long_about = None)]
pub struct Cli {
    /// Path to the scanpost.toml configuration file
    /// (default: ./scanpost.toml when present, built-in defaults otherwise).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a Nuclei scan job and index its findings.
    Scan(ScanArgs),

    /// Index a JSON file of documents.
    Ingest(IngestArgs),

    /// Count findings per severity in a Nuclei JSON export.
    Stats(StatsArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Run one scan job.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Job record (scheduler JSON with Population, Arguments, ResponsePath).
    #[arg(long)]
    pub job: PathBuf,

    /// Write the updated job record back to the job file.
    #[arg(long)]
    pub write_back: bool,

    /// Run the scanner without uploading findings.
    #[arg(long)]
    pub no_ingest: bool,
}

// ---- ingest ----

/// Index a JSON file.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// `.json` file holding a list or a mapping of documents.
    pub file: PathBuf,

    /// Target index (default: `[sink] index`).
    #[arg(long)]
    pub index: Option<String>,

    /// Index into an in-memory sink instead of the configured store.
    #[arg(long)]
    pub dry_run: bool,
}

// ---- stats ----

/// Severity statistics.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Nuclei JSON export.
    pub file: PathBuf,
}

// ---- config ----

/// Manage scanpost configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, sink, nuclei).
        #[arg(long)]
        section: Option<String>,
    },
}
