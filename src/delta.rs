//! Snapshot delta: compare two bundles' summary counters
//!
//! Counts only; there is no identity matching of individual findings here.
//! Required counters always produce a signed delta. Optional counters are
//! `None` unless the section exists in both bundles, so an unmeasured metric
//! never reads as "no change".

use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotBundle;

/// Signed change in each tracked counter between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SnapshotDelta {
    // Required sections
    pub commits: i64,
    pub contributors: i64,
    pub stale_files: i64,
    pub todos: i64,
    pub fixmes: i64,
    pub hacks: i64,

    // Optional sections
    pub complexity_hotspots: Option<i64>,
    pub deep_imports: Option<i64>,
    pub circular_chains: Option<i64>,
    pub eol_runtimes: Option<i64>,
    pub uncovered_files: Option<i64>,
    pub stale_docs: Option<i64>,
}

impl SnapshotDelta {
    /// True when every measured counter is unchanged
    pub fn is_unchanged(&self) -> bool {
        self.measured().iter().all(|(_, v)| *v == 0)
    }

    /// Counters that could be measured on both sides, by name
    pub fn measured(&self) -> Vec<(&'static str, i64)> {
        let mut out = vec![
            ("commits", self.commits),
            ("contributors", self.contributors),
            ("stale_files", self.stale_files),
            ("todos", self.todos),
            ("fixmes", self.fixmes),
            ("hacks", self.hacks),
        ];
        let optional = [
            ("complexity_hotspots", self.complexity_hotspots),
            ("deep_imports", self.deep_imports),
            ("circular_chains", self.circular_chains),
            ("eol_runtimes", self.eol_runtimes),
            ("uncovered_files", self.uncovered_files),
            ("stale_docs", self.stale_docs),
        ];
        out.extend(optional.into_iter().filter_map(|(name, v)| v.map(|v| (name, v))));
        out
    }
}

fn diff(current: u64, previous: u64) -> i64 {
    current as i64 - previous as i64
}

fn diff_optional<S>(
    previous: Option<&S>,
    current: Option<&S>,
    counter: impl Fn(&S) -> u64,
) -> Option<i64> {
    match (previous, current) {
        (Some(p), Some(c)) => Some(diff(counter(c), counter(p))),
        _ => None,
    }
}

/// Compute `current - previous` for every tracked counter.
pub fn compare(previous: &SnapshotBundle, current: &SnapshotBundle) -> SnapshotDelta {
    SnapshotDelta {
        commits: diff(current.git_stats.commit_count, previous.git_stats.commit_count),
        contributors: diff(
            current.git_stats.contributor_count,
            previous.git_stats.contributor_count,
        ),
        stale_files: diff(
            current.staleness.summary.stale_files,
            previous.staleness.summary.stale_files,
        ),
        todos: diff(
            current.debt_markers.summary.total_todos,
            previous.debt_markers.summary.total_todos,
        ),
        fixmes: diff(
            current.debt_markers.summary.total_fixmes,
            previous.debt_markers.summary.total_fixmes,
        ),
        hacks: diff(
            current.debt_markers.summary.total_hacks,
            previous.debt_markers.summary.total_hacks,
        ),
        complexity_hotspots: diff_optional(
            previous.complexity.as_ref(),
            current.complexity.as_ref(),
            |s| s.summary.hotspots,
        ),
        deep_imports: diff_optional(previous.imports.as_ref(), current.imports.as_ref(), |s| {
            s.summary.deep_imports
        }),
        circular_chains: diff_optional(previous.imports.as_ref(), current.imports.as_ref(), |s| {
            s.summary.circular_chains
        }),
        eol_runtimes: diff_optional(previous.runtime.as_ref(), current.runtime.as_ref(), |s| {
            s.summary.eol_runtimes
        }),
        uncovered_files: diff_optional(previous.coverage.as_ref(), current.coverage.as_ref(), |s| {
            s.summary.uncovered_files
        }),
        stale_docs: diff_optional(
            previous.doc_staleness.as_ref(),
            current.doc_staleness.as_ref(),
            |s| s.summary.stale_docs,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::*;

    fn bundle(todos: u64, stale: u64) -> SnapshotBundle {
        SnapshotBundle::new(
            "t",
            GitStats {
                branch: "main".to_string(),
                commit_count: 100,
                contributor_count: 3,
                ..Default::default()
            },
            StalenessSection {
                summary: StalenessSummary {
                    stale_files: stale,
                    oldest_days: 0,
                },
                ..Default::default()
            },
            DebtMarkersSection {
                summary: DebtSummary {
                    total_todos: todos,
                    total_fixmes: 1,
                    total_hacks: 0,
                },
                ..Default::default()
            },
        )
    }

    fn imports(deep: u64, circular: u64) -> ImportsSection {
        ImportsSection {
            summary: ImportsSummary {
                deep_imports: deep,
                circular_chains: circular,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_required_counters_can_go_negative() {
        let prev = bundle(20, 5);
        let curr = bundle(12, 9);
        let delta = compare(&prev, &curr);
        assert_eq!(delta.todos, -8);
        assert_eq!(delta.stale_files, 4);
        assert_eq!(delta.commits, 0);
    }

    #[test]
    fn test_optional_counter_needs_both_sides() {
        let prev = bundle(1, 1);
        let curr = bundle(1, 1).with_imports(imports(4, 2));
        let delta = compare(&prev, &curr);
        assert_eq!(delta.deep_imports, None);
        assert_eq!(delta.circular_chains, None);

        let delta = compare(&curr, &prev);
        assert_eq!(delta.deep_imports, None);

        let prev = bundle(1, 1).with_imports(imports(1, 0));
        let delta = compare(&prev, &curr);
        assert_eq!(delta.deep_imports, Some(3));
        assert_eq!(delta.circular_chains, Some(2));
    }

    #[test]
    fn test_absent_is_not_zero() {
        let prev = bundle(1, 1);
        let curr = bundle(1, 1);
        let delta = compare(&prev, &curr);
        assert_eq!(delta.uncovered_files, None);
        assert_ne!(delta.uncovered_files, Some(0));
    }

    #[test]
    fn test_compare_with_self_is_zero_or_null() {
        let b = bundle(7, 3)
            .with_imports(imports(2, 1))
            .with_coverage(CoverageSection {
                summary: CoverageSummary {
                    line_percent: 50.0,
                    uncovered_files: 4,
                },
                ..Default::default()
            });
        let delta = compare(&b, &b);
        assert!(delta.is_unchanged());
        assert_eq!(delta.deep_imports, Some(0));
        assert_eq!(delta.uncovered_files, Some(0));
        assert_eq!(delta.complexity_hotspots, None);
        assert_eq!(delta.eol_runtimes, None);
        assert_eq!(delta.stale_docs, None);
    }

    #[test]
    fn test_measured_skips_absent_counters() {
        let delta = compare(&bundle(1, 1), &bundle(3, 1));
        let names: Vec<_> = delta.measured().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 6);
        assert!(!names.contains(&"deep_imports"));
        assert!(!delta.is_unchanged());
    }
}
