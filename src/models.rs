//! Core data models for driftwatch
//!
//! These models are shared by the snapshot store, the severity engine,
//! work documents and the live update hub.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Generate a deterministic finding ID from the finding code and location.
///
/// The same code at the same path/symbol maps to the same work document on
/// every scan, which is what lets a finding accumulate history.
///
/// The ID is a 16-character hex string derived from hashing:
/// - finding code (what kind of problem)
/// - file path (where it was found, empty if none)
/// - symbol name (which function/module, empty if none)
pub fn finding_id(code: &str, path: Option<&str>, symbol: Option<&str>) -> String {
    let input = format!(
        "{code}\n{}\n{}",
        path.unwrap_or_default(),
        symbol.unwrap_or_default()
    );
    let digest = Sha256::digest(input.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Severity scale for work documents.
///
/// S0 is the most urgent and can only be set by hand; S5 is the least urgent.
/// The numeric level is the only ordering key, so `S0 < S5` in `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
}

impl Severity {
    /// Most urgent level reachable without a human (S1)
    pub const AUTO_CEILING: Severity = Severity::S1;
    /// Least urgent level reachable by automatic relief (S4)
    pub const AUTO_FLOOR: Severity = Severity::S4;

    pub fn level(self) -> u8 {
        match self {
            Severity::S0 => 0,
            Severity::S1 => 1,
            Severity::S2 => 2,
            Severity::S3 => 3,
            Severity::S4 => 4,
            Severity::S5 => 5,
        }
    }

    /// Build a severity from a level, clamping anything outside 0..=5.
    pub fn from_level_clamped(level: i32) -> Severity {
        match level.clamp(0, 5) {
            0 => Severity::S0,
            1 => Severity::S1,
            2 => Severity::S2,
            3 => Severity::S3,
            4 => Severity::S4,
            _ => Severity::S5,
        }
    }

    /// One level more urgent (S3 -> S2), clamped at S0
    pub fn more_urgent(self) -> Severity {
        Severity::from_level_clamped(i32::from(self.level()) - 1)
    }

    /// One level less urgent (S2 -> S3), clamped at S5
    pub fn less_urgent(self) -> Severity {
        Severity::from_level_clamped(i32::from(self.level()) + 1)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.level())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S0" => Ok(Severity::S0),
            "S1" => Ok(Severity::S1),
            "S2" => Ok(Severity::S2),
            "S3" => Ok(Severity::S3),
            "S4" => Ok(Severity::S4),
            "S5" => Ok(Severity::S5),
            other => Err(format!("'{}' is not a severity (expected S0-S5)", other)),
        }
    }
}

/// Trajectory of a finding between consecutive reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[default]
    New,
    Worsening,
    Stable,
    Improving,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::New => write!(f, "new"),
            Trend::Worsening => write!(f, "worsening"),
            Trend::Stable => write!(f, "stable"),
            Trend::Improving => write!(f, "improving"),
        }
    }
}

/// Lifecycle status of a work document, orthogonal to severity and trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unassigned,
    Assigned,
    Resolved,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Unassigned => write!(f, "unassigned"),
            Status::Assigned => write!(f, "assigned"),
            Status::Resolved => write!(f, "resolved"),
        }
    }
}

/// Metric family a finding was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MetricCategory {
    GitStats,
    Staleness,
    #[default]
    DebtMarkers,
    Complexity,
    Imports,
    Runtime,
    Coverage,
    DocStaleness,
}

impl std::fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetricCategory::GitStats => "git-stats",
            MetricCategory::Staleness => "staleness",
            MetricCategory::DebtMarkers => "debt-markers",
            MetricCategory::Complexity => "complexity",
            MetricCategory::Imports => "imports",
            MetricCategory::Runtime => "runtime",
            MetricCategory::Coverage => "coverage",
            MetricCategory::DocStaleness => "doc-staleness",
        };
        f.write_str(name)
    }
}

/// One observation of a problem in the current scan.
///
/// Recreated on every scan; the durable record is the work document.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FindingInstance {
    pub code: String,
    #[serde(default)]
    pub category: MetricCategory,
    /// Human-readable summary; may embed a numeric indicator ("14 TODOs")
    pub summary: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl FindingInstance {
    pub fn new(code: impl Into<String>, category: MetricCategory, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            category,
            summary: summary.into(),
            path: None,
            symbol: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Stable identity of the work document tracking this finding
    pub fn id(&self) -> String {
        finding_id(&self.code, self.path.as_deref(), self.symbol.as_deref())
    }
}
