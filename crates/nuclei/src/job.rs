//! Scan job record exchanged with the scheduler.
//!
//! Field names follow the scheduler's JSON (`Population`, `ResponsePath`,
//! `UniqueID`, ...). Fields this crate does not know about are kept in
//! [`JobRecord::extra`] and written back unchanged.
//!
//! `Arguments` is kept as raw JSON and only interpreted when the job runs,
//! so a job with malformed arguments still loads and can be marked `Failed`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use scanpost_core::types::Asset;

use crate::error::NucleiError;

/// Job lifecycle.
///
/// `Pending -> Running -> {Complete, Failed}`; a job is never retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Not started
    #[default]
    Pending,
    /// Scanner running
    Running,
    /// Scanner ran to completion
    Complete,
    /// Stopped before the scanner could run
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// A scan job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRecord {
    /// Assets to scan
    #[serde(default)]
    pub population: Vec<Asset>,
    /// Scanner arguments, resolved with [`JobRecord::nuclei_arguments`]
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
    /// Where the scanner writes its JSON findings
    pub response_path: PathBuf,
    /// Numeric run id assigned when the job starts
    #[serde(rename = "UniqueID", default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// Lifecycle state
    #[serde(default)]
    pub status: JobStatus,
    /// Failure message, set only when `status` is `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Local time the job reached a terminal state, `%Y-%m-%dT%H:%M:%S`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<String>,
    /// Scheduler fields not interpreted here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobRecord {
    /// New pending job.
    pub fn new(population: Vec<Asset>, response_path: impl Into<PathBuf>) -> Self {
        Self {
            population,
            arguments: Value::Null,
            response_path: response_path.into(),
            unique_id: None,
            status: JobStatus::Pending,
            error: None,
            expire_date: None,
            extra: Map::new(),
        }
    }

    /// Sets the arguments.
    pub fn with_arguments(mut self, arguments: NucleiArguments) -> Self {
        // a struct of strings and string lists always serializes
        self.arguments = serde_json::to_value(arguments).unwrap_or_default();
        self
    }

    /// Interprets `Arguments`. A missing, `null` or `""` value means no
    /// arguments.
    ///
    /// # Errors
    ///
    /// `NucleiError::Config` when `Arguments` or one of its fields has the
    /// wrong shape.
    pub fn nuclei_arguments(&self) -> Result<NucleiArguments, NucleiError> {
        match &self.arguments {
            Value::Null => return Ok(NucleiArguments::default()),
            Value::String(text) if text.trim().is_empty() => {
                return Ok(NucleiArguments::default());
            }
            _ => {}
        }
        NucleiArguments::deserialize(&self.arguments).map_err(|e| NucleiError::Config {
            field: "Arguments".to_owned(),
            reason: e.to_string(),
        })
    }

    /// Parses a job from its JSON text.
    pub fn from_json(text: &str, source: &str) -> Result<Self, NucleiError> {
        serde_json::from_str(text).map_err(|e| NucleiError::Config {
            field: "job".to_owned(),
            reason: format!("{source}: {e}"),
        })
    }

    /// Reads a job file.
    pub async fn load(path: &Path) -> Result<Self, NucleiError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| NucleiError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&text, &path.display().to_string())
    }

    /// Writes the job back as pretty-printed JSON.
    pub async fn save(&self, path: &Path) -> Result<(), NucleiError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| NucleiError::Config {
            field: "job".to_owned(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, text)
            .await
            .map_err(|source| NucleiError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    /// Targets handed to the scanner, in population order.
    pub fn targets(&self) -> Vec<&str> {
        self.population
            .iter()
            .map(|asset| asset.asset_string.as_str())
            .collect()
    }
}

/// Scanner arguments of a job (`Arguments` in the job JSON).
///
/// The scheduler sends unset values as `""`, so every field also accepts an
/// empty string or `null`. List fields accept either a JSON list or a single
/// string: comma-separated for tags and severities, whitespace-separated for
/// flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NucleiArguments {
    /// `-tags` filter
    #[serde(default, deserialize_with = "comma_list")]
    pub nuclei_tags: Vec<String>,
    /// `-w` workflow
    #[serde(default, deserialize_with = "optional_string")]
    pub nuclei_workflow: Option<String>,
    /// Severities left out of `-severity`
    #[serde(default, deserialize_with = "optional_comma_list")]
    pub nuclei_exclude_severity: Option<Vec<String>>,
    /// Raw flags appended to the command line
    #[serde(default, deserialize_with = "flag_list")]
    pub nuclei_argument_flags: Vec<String>,
    /// Arguments for other modules
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    Text(String),
    List(Vec<String>),
}

impl StringOrList {
    fn into_items(self, split: fn(&str) -> Vec<String>) -> Vec<String> {
        match self {
            Self::Text(text) => split(&text),
            Self::List(items) => items
                .into_iter()
                .map(|item| item.trim().to_owned())
                .filter(|item| !item.is_empty())
                .collect(),
        }
    }
}

fn split_commas(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn split_whitespace(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_owned).collect()
}

fn comma_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<StringOrList>::deserialize(d)?
        .map(|value| value.into_items(split_commas))
        .unwrap_or_default())
}

fn optional_comma_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<StringOrList>::deserialize(d)?
        .map(|value| value.into_items(split_commas))
        .filter(|items| !items.is_empty()))
}

fn flag_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<StringOrList>::deserialize(d)?
        .map(|value| match value {
            StringOrList::Text(text) => split_whitespace(&text),
            // flags like "-rate-limit 10" in a list are passed through as-is
            StringOrList::List(items) => items.into_iter().filter(|f| !f.is_empty()).collect(),
        })
        .unwrap_or_default())
}

fn optional_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_job() -> Value {
        json!({
            "Population": [
                {"asset_string": "10.0.0.1", "asset_parent_id": 7},
                {"asset_string": "app.example", "asset_parent_id": "p-2"}
            ],
            "Arguments": {
                "NucleiTags": "cve,rce",
                "NucleiWorkflow": "",
                "NucleiExcludeSeverity": ["info"],
                "NucleiArgumentFlags": ["-rl", "50"]
            },
            "ResponsePath": "/tmp/response_nuclei.json",
            "Status": "Pending",
            "JobID": 991
        })
    }

    #[test]
    fn parses_scheduler_json() {
        let job: JobRecord = serde_json::from_value(sample_job()).unwrap();
        assert_eq!(job.targets(), ["10.0.0.1", "app.example"]);
        let args = job.nuclei_arguments().unwrap();
        assert_eq!(args.nuclei_tags, ["cve", "rce"]);
        assert_eq!(args.nuclei_workflow, None);
        assert_eq!(args.nuclei_exclude_severity, Some(vec!["info".to_owned()]));
        assert_eq!(args.nuclei_argument_flags, ["-rl", "50"]);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.extra["JobID"], 991);
    }

    #[test]
    fn empty_strings_mean_unset() {
        let args: NucleiArguments = serde_json::from_value(json!({
            "NucleiTags": "",
            "NucleiWorkflow": "",
            "NucleiExcludeSeverity": "",
            "NucleiArgumentFlags": ""
        }))
        .unwrap();
        assert!(args.nuclei_tags.is_empty());
        assert!(args.nuclei_workflow.is_none());
        assert!(args.nuclei_exclude_severity.is_none());
        assert!(args.nuclei_argument_flags.is_empty());
    }

    #[test]
    fn nulls_and_missing_mean_unset() {
        let args: NucleiArguments =
            serde_json::from_value(json!({"NucleiExcludeSeverity": null})).unwrap();
        assert_eq!(args, NucleiArguments::default());
    }

    #[test]
    fn flag_string_is_split_on_whitespace() {
        let args: NucleiArguments =
            serde_json::from_value(json!({"NucleiArgumentFlags": "-rl 50  -c 10"})).unwrap();
        assert_eq!(args.nuclei_argument_flags, ["-rl", "50", "-c", "10"]);
    }

    #[test]
    fn serializes_with_scheduler_names() {
        let mut job = JobRecord::new(vec![Asset::new("h", 1)], "/tmp/out.json");
        job.status = JobStatus::Failed;
        job.error = Some("boom".to_owned());
        job.unique_id = Some("9123456".to_owned());

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["Status"], "Failed");
        assert_eq!(value["Error"], "boom");
        assert_eq!(value["UniqueID"], "9123456");
        assert_eq!(value["ResponsePath"], "/tmp/out.json");
        assert!(value.get("ExpireDate").is_none());
    }

    #[test]
    fn unknown_fields_round_trip() {
        let job: JobRecord = serde_json::from_value(sample_job()).unwrap();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["JobID"], 991);
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn malformed_arguments_still_load() {
        let mut raw = sample_job();
        raw["Arguments"] = json!({"NucleiTags": 5});
        let job = JobRecord::from_json(&raw.to_string(), "job.json").unwrap();

        let err = job.nuclei_arguments().unwrap_err();
        assert!(
            matches!(err, NucleiError::Config { ref field, .. } if field == "Arguments"),
            "{err:?}"
        );
    }

    #[test]
    fn missing_arguments_mean_defaults() {
        let job = JobRecord::from_json(r#"{"ResponsePath": "/tmp/r.json"}"#, "job.json").unwrap();
        assert_eq!(job.nuclei_arguments().unwrap(), NucleiArguments::default());
        let value = serde_json::to_value(&job).unwrap();
        assert!(value.get("Arguments").is_none());
    }

    #[test]
    fn with_arguments_round_trips() {
        let arguments = NucleiArguments {
            nuclei_tags: vec!["cve".to_owned()],
            nuclei_exclude_severity: Some(vec!["low".to_owned()]),
            ..NucleiArguments::default()
        };
        let job = JobRecord::new(Vec::new(), "/tmp/r.json").with_arguments(arguments.clone());
        assert_eq!(job.nuclei_arguments().unwrap(), arguments);
    }

    #[test]
    fn malformed_job_is_config_error() {
        let err = JobRecord::from_json("{", "job.json").unwrap_err();
        assert!(matches!(err, NucleiError::Config { .. }));
    }

    #[tokio::test]
    async fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        let job = JobRecord::new(vec![Asset::new("h", "p")], "/tmp/r.json");
        job.save(&path).await.unwrap();
        assert_eq!(JobRecord::load(&path).await.unwrap(), job);
    }
}
