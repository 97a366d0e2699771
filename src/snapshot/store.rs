//! Per-repository snapshot history on disk

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{read_bundle_dir, write_bundle_dir, GitStats, SnapshotBundle, GIT_STATS_FILE};
use crate::error::{validate_key, TrackerError, TrackerResult};
use crate::storage::{paths, read_json};

/// Prefix of in-progress snapshot directories; never listed as history
const PARTIAL_PREFIX: &str = ".partial-";

/// Stores snapshot bundles as `<data>/<slug>/snapshots/<timestamp>/`.
///
/// Timestamps are sortable strings, so descending string order is descending
/// chronological order.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Persist a bundle under its timestamp key.
    ///
    /// The bundle is written to a hidden staging directory first and renamed
    /// into place, so a crash never leaves a half-populated snapshot behind.
    pub fn save(&self, repo: &str, bundle: &SnapshotBundle) -> TrackerResult<PathBuf> {
        let target = self.ensure_new(repo, &bundle.timestamp)?;

        let staging = paths::snapshots_dir(&self.data_dir, repo)
            .join(format!("{}{}", PARTIAL_PREFIX, bundle.timestamp));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        write_bundle_dir(&staging, bundle)?;
        fs::rename(&staging, &target)?;

        info!(
            repo = repo,
            timestamp = %bundle.timestamp,
            optional = ?bundle.optional_sections(),
            "Saved snapshot"
        );
        Ok(target)
    }

    /// Check that `timestamp` is a usable key not yet taken. Returns the target directory.
    pub fn ensure_new(&self, repo: &str, timestamp: &str) -> TrackerResult<PathBuf> {
        validate_key("repository slug", repo)?;
        validate_key("timestamp", timestamp)?;
        if timestamp.starts_with('.') {
            return Err(TrackerError::InvalidKey {
                kind: "timestamp",
                value: timestamp.to_string(),
            });
        }

        let target = paths::snapshot_dir(&self.data_dir, repo, timestamp);
        if target.exists() {
            return Err(TrackerError::DuplicateSnapshot {
                repo: repo.to_string(),
                timestamp: timestamp.to_string(),
            });
        }
        Ok(target)
    }

    /// All snapshot timestamps for `repo`, newest first.
    pub fn timestamps(&self, repo: &str) -> TrackerResult<Vec<String>> {
        validate_key("repository slug", repo)?;
        let dir = paths::snapshots_dir(&self.data_dir, repo);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut timestamps: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(String::from))
            .filter(|name| !name.starts_with('.'))
            .collect();
        timestamps.sort_unstable_by(|a, b| b.cmp(a));
        Ok(timestamps)
    }

    /// Load the bundle stored under `timestamp`.
    pub fn load(&self, repo: &str, timestamp: &str) -> TrackerResult<SnapshotBundle> {
        validate_key("repository slug", repo)?;
        validate_key("timestamp", timestamp)?;
        let dir = paths::snapshot_dir(&self.data_dir, repo, timestamp);
        if !dir.is_dir() {
            return Err(TrackerError::SnapshotNotFound {
                repo: repo.to_string(),
                what: format!("timestamp {}", timestamp),
            });
        }
        read_bundle_dir(&dir, repo, timestamp)
    }

    /// Most recent bundle. Fails with `NoSnapshots` when history is empty.
    pub fn latest(&self, repo: &str) -> TrackerResult<SnapshotBundle> {
        let timestamps = self.timestamps(repo)?;
        let newest = timestamps.first().ok_or_else(|| TrackerError::NoSnapshots {
            repo: repo.to_string(),
        })?;
        self.load(repo, newest)
    }

    /// Second most recent bundle, or `None` when fewer than two exist.
    pub fn previous(&self, repo: &str) -> TrackerResult<Option<SnapshotBundle>> {
        let timestamps = self.timestamps(repo)?;
        match timestamps.get(1) {
            Some(ts) => self.load(repo, ts).map(Some),
            None => Ok(None),
        }
    }

    /// Newest bundle whose git statistics report `branch`.
    ///
    /// Snapshots whose git-stats file cannot be read are skipped.
    pub fn latest_for_branch(&self, repo: &str, branch: &str) -> TrackerResult<SnapshotBundle> {
        let timestamps = self.timestamps(repo)?;
        if timestamps.is_empty() {
            return Err(TrackerError::NoSnapshots {
                repo: repo.to_string(),
            });
        }

        for ts in &timestamps {
            let git_file = paths::snapshot_dir(&self.data_dir, repo, ts).join(GIT_STATS_FILE);
            match read_json::<GitStats>(&git_file) {
                Ok(Some(git)) if git.branch == branch => return self.load(repo, ts),
                Ok(Some(_)) => {}
                Ok(None) => warn!(repo = repo, timestamp = %ts, "Snapshot has no git-stats, skipping"),
                Err(e) => warn!(repo = repo, timestamp = %ts, "Unreadable git-stats, skipping: {}", e),
            }
        }

        Err(TrackerError::SnapshotNotFound {
            repo: repo.to_string(),
            what: format!("branch '{}'", branch),
        })
    }

    /// Delete all but the newest `keep` snapshots. Returns how many were removed.
    pub fn prune(&self, repo: &str, keep: usize) -> TrackerResult<usize> {
        let timestamps = self.timestamps(repo)?;
        let mut removed = 0;
        for ts in timestamps.iter().skip(keep) {
            let dir = paths::snapshot_dir(&self.data_dir, repo, ts);
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    debug!(repo = repo, timestamp = %ts, "Pruned snapshot");
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::sample_bundle;
    use crate::snapshot::{ComplexitySection, ComplexitySummary, RUNTIME_FILE};
    use tempfile::tempdir;

    fn on_branch(mut bundle: SnapshotBundle, branch: &str) -> SnapshotBundle {
        bundle.git_stats.branch = branch.to_string();
        bundle
    }

    #[test]
    fn test_latest_on_empty_history_is_actionable() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let err = store.latest("repo-a").unwrap_err();
        assert!(err.is_missing_history());
    }

    #[test]
    fn test_previous_needs_two_snapshots() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.previous("repo-a").unwrap().is_none());

        store.save("repo-a", &sample_bundle("2026-01-01T00-00-00.000Z")).unwrap();
        assert!(store.previous("repo-a").unwrap().is_none());

        store.save("repo-a", &sample_bundle("2026-01-02T00-00-00.000Z")).unwrap();
        let prev = store.previous("repo-a").unwrap().unwrap();
        assert_eq!(prev.timestamp, "2026-01-01T00-00-00.000Z");
        assert_eq!(
            store.latest("repo-a").unwrap().timestamp,
            "2026-01-02T00-00-00.000Z"
        );
    }

    #[test]
    fn test_timestamps_newest_first_regardless_of_save_order() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        for ts in ["2026-03-01", "2026-01-01", "2026-02-01"] {
            store.save("repo-a", &sample_bundle(ts)).unwrap();
        }
        assert_eq!(
            store.timestamps("repo-a").unwrap(),
            vec!["2026-03-01", "2026-02-01", "2026-01-01"]
        );
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save("repo-a", &sample_bundle("t1")).unwrap();
        let err = store.save("repo-a", &sample_bundle("t1")).unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateSnapshot { .. }));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let bundle = sample_bundle("t1").with_complexity(ComplexitySection {
            summary: ComplexitySummary {
                hotspots: 5,
                max_complexity: 31,
            },
            ..Default::default()
        });
        store.save("repo-a", &bundle).unwrap();

        let back = store.load("repo-a", "t1").unwrap();
        assert_eq!(back, bundle);
        // No optional section is invented on load
        assert!(back.imports.is_none());
        assert!(back.coverage.is_none());
    }

    #[test]
    fn test_repositories_are_isolated() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save("repo-a", &sample_bundle("t1")).unwrap();
        assert!(store.timestamps("repo-b").unwrap().is_empty());
        assert!(store.latest("repo-b").is_err());
    }

    #[test]
    fn test_latest_for_branch_scans_newest_first() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save("repo-a", &on_branch(sample_bundle("t1"), "main")).unwrap();
        store.save("repo-a", &on_branch(sample_bundle("t2"), "feature")).unwrap();
        store.save("repo-a", &on_branch(sample_bundle("t3"), "main")).unwrap();
        store.save("repo-a", &on_branch(sample_bundle("t4"), "feature")).unwrap();

        assert_eq!(store.latest_for_branch("repo-a", "main").unwrap().timestamp, "t3");
        assert_eq!(store.latest_for_branch("repo-a", "feature").unwrap().timestamp, "t4");

        let err = store.latest_for_branch("repo-a", "release").unwrap_err();
        assert!(matches!(err, TrackerError::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_latest_for_branch_skips_unreadable_git_stats() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save("repo-a", &on_branch(sample_bundle("t1"), "main")).unwrap();
        let newer = store.save("repo-a", &on_branch(sample_bundle("t2"), "main")).unwrap();
        fs::write(newer.join(GIT_STATS_FILE), "garbage").unwrap();

        assert_eq!(store.latest_for_branch("repo-a", "main").unwrap().timestamp, "t1");
    }

    #[test]
    fn test_degraded_optional_section_on_load() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let path = store.save("repo-a", &sample_bundle("t1")).unwrap();
        fs::write(path.join(RUNTIME_FILE), "{]").unwrap();

        let back = store.latest("repo-a").unwrap();
        assert!(back.runtime.is_none());
    }

    #[test]
    fn test_staging_directories_are_not_history() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save("repo-a", &sample_bundle("t1")).unwrap();
        fs::create_dir_all(paths::snapshots_dir(dir.path(), "repo-a").join(".partial-t2")).unwrap();
        assert_eq!(store.timestamps("repo-a").unwrap(), vec!["t1"]);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        for ts in ["t1", "t2", "t3", "t4"] {
            store.save("repo-a", &sample_bundle(ts)).unwrap();
        }
        assert_eq!(store.prune("repo-a", 2).unwrap(), 2);
        assert_eq!(store.timestamps("repo-a").unwrap(), vec!["t4", "t3"]);
        assert_eq!(store.prune("repo-a", 5).unwrap(), 0);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.save("../escape", &sample_bundle("t1")).is_err());
        assert!(store.save("repo-a", &sample_bundle("a/b")).is_err());
        assert!(store.save("repo-a", &sample_bundle(".hidden")).is_err());
    }
}
