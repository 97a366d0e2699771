//! Snapshot bundles and their storage
//!
//! A bundle is the immutable output of one scan of one repository. The three
//! required sections (git statistics, staleness, debt markers) are always
//! present; the optional ones are `None` when the collector was not run, is
//! unsupported for the target, or its file could not be read back.

mod sections;
mod store;

pub use sections::*;
pub use store::SnapshotStore;

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

use crate::error::{TrackerError, TrackerResult};
use crate::storage::{read_json, write_json_atomic};

pub const GIT_STATS_FILE: &str = "git-stats.json";
pub const STALENESS_FILE: &str = "staleness.json";
pub const DEBT_MARKERS_FILE: &str = "debt-markers.json";
pub const COMPLEXITY_FILE: &str = "complexity.json";
pub const IMPORTS_FILE: &str = "imports.json";
pub const RUNTIME_FILE: &str = "runtime.json";
pub const COVERAGE_FILE: &str = "coverage.json";
pub const DOC_STALENESS_FILE: &str = "doc-staleness.json";

/// Format a timestamp key for a snapshot taken now.
///
/// Keys sort lexicographically in chronological order and are safe as
/// directory names on every platform (no `:`).
pub fn timestamp_now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H-%M-%S%.3fZ")
        .to_string()
}

/// All metric sections produced by one scan
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SnapshotBundle {
    /// Sortable timestamp key, unique within the repository
    pub timestamp: String,
    pub git_stats: GitStats,
    pub staleness: StalenessSection,
    pub debt_markers: DebtMarkersSection,
    #[serde(default)]
    pub complexity: Option<ComplexitySection>,
    #[serde(default)]
    pub imports: Option<ImportsSection>,
    #[serde(default)]
    pub runtime: Option<RuntimeSection>,
    #[serde(default)]
    pub coverage: Option<CoverageSection>,
    #[serde(default)]
    pub doc_staleness: Option<DocStalenessSection>,
}

impl SnapshotBundle {
    /// Create a bundle with the required sections only.
    pub fn new(
        timestamp: impl Into<String>,
        git_stats: GitStats,
        staleness: StalenessSection,
        debt_markers: DebtMarkersSection,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            git_stats,
            staleness,
            debt_markers,
            ..Default::default()
        }
    }

    pub fn with_complexity(mut self, section: ComplexitySection) -> Self {
        self.complexity = Some(section);
        self
    }

    pub fn with_imports(mut self, section: ImportsSection) -> Self {
        self.imports = Some(section);
        self
    }

    pub fn with_runtime(mut self, section: RuntimeSection) -> Self {
        self.runtime = Some(section);
        self
    }

    pub fn with_coverage(mut self, section: CoverageSection) -> Self {
        self.coverage = Some(section);
        self
    }

    pub fn with_doc_staleness(mut self, section: DocStalenessSection) -> Self {
        self.doc_staleness = Some(section);
        self
    }

    /// Names of the optional sections present in this bundle
    pub fn optional_sections(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.complexity.is_some() {
            present.push("complexity");
        }
        if self.imports.is_some() {
            present.push("imports");
        }
        if self.runtime.is_some() {
            present.push("runtime");
        }
        if self.coverage.is_some() {
            present.push("coverage");
        }
        if self.doc_staleness.is_some() {
            present.push("doc-staleness");
        }
        present
    }
}

/// Write every present section of `bundle` into `dir`, one file per section.
pub fn write_bundle_dir(dir: &Path, bundle: &SnapshotBundle) -> TrackerResult<()> {
    fs::create_dir_all(dir)?;
    write_json_atomic(&dir.join(GIT_STATS_FILE), &bundle.git_stats)?;
    write_json_atomic(&dir.join(STALENESS_FILE), &bundle.staleness)?;
    write_json_atomic(&dir.join(DEBT_MARKERS_FILE), &bundle.debt_markers)?;

    if let Some(section) = &bundle.complexity {
        write_json_atomic(&dir.join(COMPLEXITY_FILE), section)?;
    }
    if let Some(section) = &bundle.imports {
        write_json_atomic(&dir.join(IMPORTS_FILE), section)?;
    }
    if let Some(section) = &bundle.runtime {
        write_json_atomic(&dir.join(RUNTIME_FILE), section)?;
    }
    if let Some(section) = &bundle.coverage {
        write_json_atomic(&dir.join(COVERAGE_FILE), section)?;
    }
    if let Some(section) = &bundle.doc_staleness {
        write_json_atomic(&dir.join(DOC_STALENESS_FILE), section)?;
    }
    Ok(())
}

/// Read a bundle laid out as one file per section.
///
/// Required sections that are missing or unparsable fail the whole read with
/// the repository and timestamp attached. Optional sections degrade to `None`.
pub fn read_bundle_dir(dir: &Path, repo: &str, timestamp: &str) -> TrackerResult<SnapshotBundle> {
    let git_stats = read_required(dir, GIT_STATS_FILE, "git-stats", repo, timestamp)?;
    let staleness = read_required(dir, STALENESS_FILE, "staleness", repo, timestamp)?;
    let debt_markers = read_required(dir, DEBT_MARKERS_FILE, "debt-markers", repo, timestamp)?;

    Ok(SnapshotBundle {
        timestamp: timestamp.to_string(),
        git_stats,
        staleness,
        debt_markers,
        complexity: read_optional(dir, COMPLEXITY_FILE, repo, timestamp),
        imports: read_optional(dir, IMPORTS_FILE, repo, timestamp),
        runtime: read_optional(dir, RUNTIME_FILE, repo, timestamp),
        coverage: read_optional(dir, COVERAGE_FILE, repo, timestamp),
        doc_staleness: read_optional(dir, DOC_STALENESS_FILE, repo, timestamp),
    })
}

fn read_required<T: serde::de::DeserializeOwned>(
    dir: &Path,
    file: &str,
    section: &'static str,
    repo: &str,
    timestamp: &str,
) -> TrackerResult<T> {
    let wrap = |source: TrackerError| TrackerError::SectionLoad {
        repo: repo.to_string(),
        timestamp: timestamp.to_string(),
        section,
        source: Box::new(source),
    };

    match read_json::<T>(&dir.join(file)) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(wrap(TrackerError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is missing", file),
        )))),
        Err(e) => Err(wrap(e)),
    }
}

fn read_optional<T: serde::de::DeserializeOwned>(
    dir: &Path,
    file: &str,
    repo: &str,
    timestamp: &str,
) -> Option<T> {
    match read_json::<T>(&dir.join(file)) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                repo = repo,
                timestamp = timestamp,
                "Optional section {} unreadable, treating as absent: {}",
                file,
                e
            );
            None
        }
    }
}
