//! Domain types shared by the scanner and the sink.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Finding severity as reported by Nuclei templates.
///
/// Ordering follows the scanner's own severity universe:
/// `Info < Low < Medium < High < Critical < Unknown`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    #[default]
    Info,
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
    /// Template did not declare a severity
    Unknown,
}

impl Severity {
    /// Every severity the scanner knows about, in filter order.
    pub const ALL: [Severity; 6] = [
        Self::Info,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
        Self::Unknown,
    ];

    /// Lowercase name as used on the scanner command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a severity name, case-insensitively.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scan target.
///
/// `asset_string` is the hostname or IP handed to the scanner.
/// `asset_parent_id` is an opaque identifier owned by the asset inventory;
/// it is copied onto findings verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Hostname or IP
    pub asset_string: String,
    /// Inventory identifier of the owning asset
    #[serde(default)]
    pub asset_parent_id: serde_json::Value,
}

impl Asset {
    /// Creates an asset.
    pub fn new(asset_string: impl Into<String>, asset_parent_id: impl Into<serde_json::Value>) -> Self {
        Self {
            asset_string: asset_string.into(),
            asset_parent_id: asset_parent_id.into(),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (parent={})", self.asset_string, self.asset_parent_id)
    }
}
