//! Typed snapshot sections produced by the external collectors
//!
//! Each section is self-describing and stored as its own JSON file. Every
//! section carries a summary block with the counters the delta engine reads.

use serde::{Deserialize, Serialize};

/// Git statistics for the scanned revision (required)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GitStats {
    pub branch: String,
    #[serde(default)]
    pub head_commit: Option<String>,
    #[serde(default)]
    pub commit_count: u64,
    #[serde(default)]
    pub contributor_count: u64,
    #[serde(default)]
    pub files_touched: u64,
}

/// Files that have not changed for longer than the staleness threshold (required)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StalenessSection {
    #[serde(default)]
    pub threshold_days: u32,
    #[serde(default)]
    pub entries: Vec<StaleEntry>,
    #[serde(default)]
    pub summary: StalenessSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StaleEntry {
    pub path: String,
    pub days_since_change: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StalenessSummary {
    pub stale_files: u64,
    #[serde(default)]
    pub oldest_days: u32,
}

/// TODO/FIXME/HACK markers found in source (required)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DebtMarkersSection {
    #[serde(default)]
    pub markers: Vec<DebtMarker>,
    #[serde(default)]
    pub summary: DebtSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DebtMarker {
    pub path: String,
    pub line: u32,
    /// TODO, FIXME or HACK
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DebtSummary {
    pub total_todos: u64,
    #[serde(default)]
    pub total_fixmes: u64,
    #[serde(default)]
    pub total_hacks: u64,
}

/// Cyclomatic complexity per function (optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ComplexitySection {
    #[serde(default)]
    pub functions: Vec<ComplexityEntry>,
    #[serde(default)]
    pub summary: ComplexitySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ComplexityEntry {
    pub path: String,
    pub symbol: String,
    pub complexity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ComplexitySummary {
    /// Functions above the complexity threshold
    pub hotspots: u64,
    #[serde(default)]
    pub max_complexity: u32,
}

/// Import graph analysis (optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImportsSection {
    #[serde(default)]
    pub deep_imports: Vec<DeepImport>,
    /// Each chain lists the modules forming the cycle
    #[serde(default)]
    pub circular_chains: Vec<Vec<String>>,
    #[serde(default)]
    pub summary: ImportsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeepImport {
    pub path: String,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImportsSummary {
    pub deep_imports: u64,
    pub circular_chains: u64,
}

/// Language runtimes and their support status (optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeSection {
    #[serde(default)]
    pub runtimes: Vec<RuntimeEntry>,
    #[serde(default)]
    pub summary: RuntimeSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeEntry {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub end_of_life: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeSummary {
    pub eol_runtimes: u64,
}

/// Test coverage (optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CoverageSection {
    #[serde(default)]
    pub files: Vec<CoverageEntry>,
    #[serde(default)]
    pub summary: CoverageSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CoverageEntry {
    pub path: String,
    pub line_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CoverageSummary {
    #[serde(default)]
    pub line_percent: f64,
    /// Files with no covered lines
    pub uncovered_files: u64,
}

/// Documentation lagging behind the code it describes (optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocStalenessSection {
    #[serde(default)]
    pub docs: Vec<StaleDoc>,
    #[serde(default)]
    pub summary: DocStalenessSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StaleDoc {
    pub path: String,
    pub lagging_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocStalenessSummary {
    pub stale_docs: u64,
}
