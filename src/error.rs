//! Error taxonomy for the tracking pipeline
//!
//! Degraded optional sections and malformed hub messages never become
//! errors; they are logged and absorbed where they happen.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while tracking findings
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("No snapshots recorded for '{repo}'. Run collection first (`driftwatch ingest {repo} --bundle <dir>`)")]
    NoSnapshots { repo: String },

    #[error("No snapshot of '{repo}' matches {what}")]
    SnapshotNotFound { repo: String, what: String },

    #[error("Snapshot {timestamp} already exists for '{repo}'")]
    DuplicateSnapshot { repo: String, timestamp: String },

    #[error("Invalid {kind} '{value}': must be a non-empty name without path separators")]
    InvalidKey { kind: &'static str, value: String },

    #[error("Failed to load required section '{section}' of snapshot {timestamp} for '{repo}': {source}")]
    SectionLoad {
        repo: String,
        timestamp: String,
        section: &'static str,
        #[source]
        source: Box<TrackerError>,
    },

    #[error("Unknown repository '{0}'. Add it to [[repos]] in driftwatch.toml")]
    UnknownRepository(String),

    #[error("No work document '{id}' in '{repo}'")]
    WorkDocumentNotFound { repo: String, id: String },

    #[error("Corrupt record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TrackerError {
    /// True when the failure means "nothing has been collected yet" rather than a fault
    pub fn is_missing_history(&self) -> bool {
        matches!(self, TrackerError::NoSnapshots { .. })
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Reject keys that cannot be used as a single storage path component.
pub(crate) fn validate_key(kind: &'static str, value: &str) -> TrackerResult<()> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.chars().any(char::is_control);
    if bad {
        return Err(TrackerError::InvalidKey {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}
