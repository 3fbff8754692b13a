//! Command handlers -- one module per subcommand

pub mod config;
pub mod ingest;
pub mod scan;
pub mod stats;

use std::path::Path;

use scanpost_core::config::ScanpostConfig;
use scanpost_core::error::ScanpostError;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "scanpost.toml";

/// Label used as the config source when no file was read.
const BUILTIN_SOURCE: &str = "(built-in defaults)";

/// Effective configuration and where it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ScanpostConfig,
    pub source: String,
}

/// Loads the effective configuration.
///
/// An explicit path must exist. Without one, `./scanpost.toml` is read when
/// present; otherwise built-in defaults are used. Environment overrides apply
/// in every case.
pub async fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ScanpostError> {
    if let Some(path) = path {
        return load_file(path).await;
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if tokio::fs::try_exists(default_path).await.unwrap_or(false) {
        return load_file(default_path).await;
    }

    let mut config = ScanpostConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(LoadedConfig {
        config,
        source: BUILTIN_SOURCE.to_owned(),
    })
}

async fn load_file(path: &Path) -> Result<LoadedConfig, ScanpostError> {
    Ok(LoadedConfig {
        config: ScanpostConfig::load(path).await?,
        source: path.display().to_string(),
    })
}
