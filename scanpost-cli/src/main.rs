//! scanpost -- runs Nuclei scan jobs and indexes their findings.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use scanpost_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli).await {
        eprintln!("error: failed to initialize logging: {e}");
        std::process::exit(2);
    }

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

/// Logging follows `[general]` of the effective config, falling back to
/// defaults when the config cannot be loaded so that `config validate` can
/// still report the problem.
async fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut general = match load_config(cli.config.as_deref()).await {
        Ok(loaded) => loaded.config.general,
        Err(_) => GeneralConfig::default(),
    };
    if let Some(ref level) = cli.log_level {
        general.log_level = level.clone();
    }
    logging::init_tracing(&general)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, config_path, &writer).await,
        Commands::Ingest(args) => commands::ingest::execute(args, config_path, &writer).await,
        Commands::Stats(args) => commands::stats::execute(args, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}
