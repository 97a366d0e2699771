//! Storage path utilities
//!
//! Layout under the data directory:
//!
//! ```text
//! <data>/<slug>/snapshots/<timestamp>/<section>.json
//! <data>/<slug>/work/<finding-id>.json
//! <data>/<slug>/alerts/<finding-id>.json
//! <data>/<slug>/.lock
//! ```

use std::path::{Path, PathBuf};

/// Root directory for one repository.
pub fn repo_dir(data_dir: &Path, slug: &str) -> PathBuf {
    data_dir.join(slug)
}

/// Directory holding one subdirectory per snapshot timestamp.
pub fn snapshots_dir(data_dir: &Path, slug: &str) -> PathBuf {
    repo_dir(data_dir, slug).join("snapshots")
}

/// Directory of a single snapshot bundle.
pub fn snapshot_dir(data_dir: &Path, slug: &str, timestamp: &str) -> PathBuf {
    snapshots_dir(data_dir, slug).join(timestamp)
}

/// Directory of persisted work documents.
pub fn work_dir(data_dir: &Path, slug: &str) -> PathBuf {
    repo_dir(data_dir, slug).join("work")
}

/// Path of one work document.
pub fn work_document_path(data_dir: &Path, slug: &str, finding_id: &str) -> PathBuf {
    work_dir(data_dir, slug).join(format!("{}.json", finding_id))
}

/// Directory of alert records.
pub fn alerts_dir(data_dir: &Path, slug: &str) -> PathBuf {
    repo_dir(data_dir, slug).join("alerts")
}

/// Path of the alert record for one finding.
pub fn alert_path(data_dir: &Path, slug: &str, finding_id: &str) -> PathBuf {
    alerts_dir(data_dir, slug).join(format!("{}.json", finding_id))
}

/// Advisory lock file of one repository.
pub fn lock_path(data_dir: &Path, slug: &str) -> PathBuf {
    repo_dir(data_dir, slug).join(".lock")
}
