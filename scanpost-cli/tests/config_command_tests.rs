//! Integration tests for `scanpost config`.
//!
//! Tests config loading and section display with real TOML files.

use std::fs;
use tempfile::TempDir;

use scanpost_core::config::ScanpostConfig;
use scanpost_nuclei::NucleiConfig;
use scanpost_sink::SinkConfig;

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scanpost.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "json"

[sink]
host = "es.internal"
port = 9200
scheme = "https"
index = "artifact_nuclei"

[nuclei]
binary_path = "/opt/nuclei/nuclei"
templates_dir = ""
timeout_secs = 5
max_host_errors = 3
"#;

    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let config = ScanpostConfig::load(&config_path)
        .await
        .expect("valid config should load successfully");

    // Then: Derived runner and sink settings validate too
    let nuclei = NucleiConfig::from_core(&config.nuclei).with_index(&config.sink.index);
    nuclei.validate().expect("runner settings should be valid");
    assert!(nuclei.templates_dir.is_none());
    assert_eq!(nuclei.timeout_secs, 5);

    let sink = SinkConfig::from_core(&config.sink);
    sink.validate().expect("sink settings should be valid");
    assert_eq!(sink.base_url(), "https://es.internal:9200");
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    // Given: A malformed TOML file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(&config_path, "[sink\nhost = \"x\"\n").expect("should write bad config");

    // When/Then: Loading fails
    let result = ScanpostConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let config_path = std::path::PathBuf::from("/nonexistent/scanpost.toml");

    let result = ScanpostConfig::load(&config_path).await;

    assert!(result.is_err(), "missing file should fail to load");
}

#[tokio::test]
async fn test_config_validate_empty_file_uses_defaults() {
    // Given: An empty config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").expect("should write empty file");

    // When: Loading the config
    let config = ScanpostConfig::from_file(&config_path)
        .await
        .expect("empty config should load with defaults");

    // Then: Defaults apply
    assert_eq!(config.sink.index, "artifact_nuclei");
    assert_eq!(config.sink.port, 9200);
    assert_eq!(config.nuclei.max_host_errors, 1);
}

#[tokio::test]
async fn test_config_invalid_scheme_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scheme.toml");
    fs::write(&config_path, "[sink]\nscheme = \"ftp\"\n").expect("should write config");

    let err = ScanpostConfig::from_file(&config_path)
        .await
        .expect_err("ftp scheme should be rejected");

    assert!(err.to_string().contains("sink.scheme"));
}

#[tokio::test]
async fn test_config_uppercase_index_passes_file_checks_but_not_runner() {
    // Given: An index name the store would reject
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("index.toml");
    fs::write(&config_path, "[sink]\nindex = \"Artifact_Nuclei\"\n").expect("should write config");

    // When: Loading the file
    let config = ScanpostConfig::from_file(&config_path)
        .await
        .expect("file-level checks accept any non-empty index");

    // Then: The runner settings reject it
    let nuclei = NucleiConfig::from_core(&config.nuclei).with_index(&config.sink.index);
    assert!(nuclei.validate().is_err());
}

#[tokio::test]
async fn test_config_show_sections_serialize() {
    let config = ScanpostConfig::default();

    for section in [
        toml::to_string_pretty(&config.general),
        toml::to_string_pretty(&config.sink),
        toml::to_string_pretty(&config.nuclei),
    ] {
        let text = section.expect("section should serialize");
        assert!(!text.is_empty());
    }

    let full = toml::to_string_pretty(&config).expect("full config should serialize");
    assert!(full.contains("[general]"));
    assert!(full.contains("[sink]"));
    assert!(full.contains("[nuclei]"));

    // Round trip keeps values
    let reparsed = ScanpostConfig::parse(&full).expect("shown config should parse");
    assert_eq!(reparsed.sink.index, config.sink.index);
}
