//! Scan ingestion pipeline
//!
//! Orchestrates one scan of one repository:
//! 1. Find the bundle persisted before this scan began
//! 2. Compare it with the new bundle
//! 3. Create or update a work document per reported finding, in memory
//! 4. Commit: documents, then alerts, then the new bundle
//! 5. Broadcast the resulting events
//!
//! Steps 1-4 run under a per-repository lock, in-process and on the lock
//! file, so two scans of the same repository never interleave. Different
//! repositories proceed independently.
//!
//! The bundle is saved last. A scan that fails before that point restores
//! the documents it touched, so retrying with the same timestamp counts
//! each finding once.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::delta::{compare, SnapshotDelta};
use crate::error::{TrackerError, TrackerResult};
use crate::escalation::{detect_escalations, AlertPayload, AlertStore};
use crate::hub::{EventKind, Hub, LiveEvent};
use crate::models::FindingInstance;
use crate::severity::{SeverityEngine, SeverityTable};
use crate::snapshot::{SnapshotBundle, SnapshotStore};
use crate::storage::lock::{lock_repo, RepoLock};
use crate::work::{self, Observation, SeverityChange, WorkDocument, WorkStore};

/// An alert written during a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscalationRecord {
    pub alert: AlertPayload,
    pub path: PathBuf,
}

/// Everything one scan changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub repo: String,
    pub timestamp: String,
    /// `None` on the first scan of a repository
    pub delta: Option<SnapshotDelta>,
    /// Ids of documents created by this scan
    pub created: Vec<String>,
    /// Ids of existing documents that recurred (reopened ones included)
    pub updated: Vec<String>,
    pub reopened: Vec<String>,
    pub severity_changes: Vec<SeverityChange>,
    pub escalations: Vec<EscalationRecord>,
    /// Open documents this scan did not report. Resolution is left to a human.
    pub missing: Vec<String>,
    /// Documents as saved by this scan, in finding order
    pub documents: Vec<WorkDocument>,
}

/// Stores and engine shared with blocking tasks
struct TrackerState {
    snapshots: SnapshotStore,
    work: WorkStore,
    alerts: AlertStore,
    engine: SeverityEngine,
}

/// Finding-lifecycle tracker for a set of repositories.
///
/// Cheap to clone; clones share stores, locks and hub.
#[derive(Clone)]
pub struct Tracker {
    state: Arc<TrackerState>,
    hub: Arc<Hub>,
    repos: Arc<HashSet<String>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Tracker {
    /// Tracker over the configured data directory
    pub fn new(config: &TrackerConfig, hub: Arc<Hub>) -> Self {
        Self::with_data_dir(config.data_dir(), config, hub)
    }

    /// Tracker over an explicit data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>, config: &TrackerConfig, hub: Arc<Hub>) -> Self {
        let data_dir = data_dir.into();
        let repos = config.repo_slugs();
        for slug in &repos {
            hub.register_repo(slug.clone());
        }
        let engine = SeverityEngine::new(SeverityTable::with_overrides(&config.severity));

        debug!(
            data_dir = %data_dir.display(),
            repos = repos.len(),
            overrides = config.severity.len(),
            "Tracker ready"
        );

        Self {
            state: Arc::new(TrackerState {
                snapshots: SnapshotStore::new(&data_dir),
                work: WorkStore::new(&data_dir),
                alerts: AlertStore::new(&data_dir),
                engine,
            }),
            hub,
            repos: Arc::new(repos),
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.state.snapshots.data_dir()
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.state.snapshots
    }

    pub fn engine(&self) -> &SeverityEngine {
        &self.state.engine
    }

    pub fn is_known(&self, repo: &str) -> bool {
        self.repos.contains(repo)
    }

    fn ensure_known(&self, repo: &str) -> TrackerResult<()> {
        if self.is_known(repo) {
            Ok(())
        } else {
            Err(TrackerError::UnknownRepository(repo.to_string()))
        }
    }

    fn repo_lock(&self, repo: &str) -> Arc<Mutex<()>> {
        self.locks.entry(repo.to_string()).or_default().value().clone()
    }

    /// Process one scan. Scans of the same repository run in submission order.
    pub async fn ingest(
        &self,
        repo: &str,
        bundle: SnapshotBundle,
        findings: Vec<FindingInstance>,
    ) -> TrackerResult<ScanOutcome> {
        self.ensure_known(repo)?;
        let guard = self.repo_lock(repo).lock_owned().await;

        let state = Arc::clone(&self.state);
        let slug = repo.to_string();
        let outcome = tokio::task::spawn_blocking(move || {
            let _lock = state.lock(&slug)?;
            state.apply_scan(&slug, bundle, &findings, Utc::now())
        })
        .await??;
        drop(guard);

        info!(
            repo = repo,
            timestamp = %outcome.timestamp,
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            severity_changes = outcome.severity_changes.len(),
            escalations = outcome.escalations.len(),
            missing = outcome.missing.len(),
            "Scan ingested"
        );

        self.publish(&outcome);
        Ok(outcome)
    }

    fn publish(&self, outcome: &ScanOutcome) {
        let slug = &outcome.repo;
        self.hub.broadcast(&LiveEvent::new(
            EventKind::SnapshotReady,
            slug.as_str(),
            json!({ "timestamp": outcome.timestamp }),
        ));
        self.hub.broadcast(&LiveEvent::new(
            EventKind::AnalysisReady,
            slug.as_str(),
            json!({ "timestamp": outcome.timestamp, "delta": outcome.delta }),
        ));
        for doc in &outcome.documents {
            self.hub.broadcast(&document_event(slug, doc));
        }
        for record in &outcome.escalations {
            self.hub.broadcast(&LiveEvent::new(
                EventKind::WorkUpdate,
                slug.as_str(),
                json!({ "event": "escalation", "alert": record.alert, "path": record.path }),
            ));
        }
    }

    /// Assign a document to someone. Assigned documents stop escalating.
    pub async fn assign(&self, repo: &str, id: &str, assignee: &str) -> TrackerResult<WorkDocument> {
        let assignee = assignee.to_string();
        self.mutate_document(repo, id, move |doc, now| work::assign(doc, &assignee, now))
            .await
    }

    /// Record the external decision that a finding is resolved.
    pub async fn resolve(&self, repo: &str, id: &str, reason: &str) -> TrackerResult<WorkDocument> {
        let reason = reason.to_string();
        self.mutate_document(repo, id, move |doc, now| work::resolve(doc, &reason, now))
            .await
    }

    async fn mutate_document<F>(&self, repo: &str, id: &str, apply: F) -> TrackerResult<WorkDocument>
    where
        F: FnOnce(&mut WorkDocument, DateTime<Utc>) + Send + 'static,
    {
        self.ensure_known(repo)?;
        let guard = self.repo_lock(repo).lock_owned().await;

        let state = Arc::clone(&self.state);
        let (slug, id) = (repo.to_string(), id.to_string());
        let doc = tokio::task::spawn_blocking(move || -> TrackerResult<WorkDocument> {
            let _lock = state.lock(&slug)?;
            let mut doc = state
                .work
                .load(&slug, &id)?
                .ok_or_else(|| TrackerError::WorkDocumentNotFound {
                    repo: slug.clone(),
                    id: id.clone(),
                })?;
            apply(&mut doc, Utc::now());
            state.work.save(&slug, &doc)?;
            Ok(doc)
        })
        .await??;
        drop(guard);

        self.hub.broadcast(&document_event(repo, &doc));
        Ok(doc)
    }

    /// Write alerts for every document that currently qualifies.
    pub async fn raise_escalations(&self, repo: &str) -> TrackerResult<Vec<EscalationRecord>> {
        self.ensure_known(repo)?;
        let guard = self.repo_lock(repo).lock_owned().await;

        let state = Arc::clone(&self.state);
        let slug = repo.to_string();
        let records = tokio::task::spawn_blocking(move || {
            let _lock = state.lock(&slug)?;
            let docs = state.work.load_all(&slug)?;
            state.write_alerts(&slug, &docs, Utc::now())
        })
        .await??;
        drop(guard);

        for record in &records {
            self.hub.broadcast(&LiveEvent::new(
                EventKind::WorkUpdate,
                repo,
                json!({ "event": "escalation", "alert": record.alert, "path": record.path }),
            ));
        }
        Ok(records)
    }

    /// Keep the newest `keep` snapshots of `repo`. Returns how many were removed.
    pub async fn prune(&self, repo: &str, keep: usize) -> TrackerResult<usize> {
        self.ensure_known(repo)?;
        let guard = self.repo_lock(repo).lock_owned().await;

        let state = Arc::clone(&self.state);
        let slug = repo.to_string();
        let removed = tokio::task::spawn_blocking(move || {
            let _lock = state.lock(&slug)?;
            state.snapshots.prune(&slug, keep)
        })
        .await??;
        drop(guard);

        info!(repo = repo, keep = keep, removed = removed, "Pruned snapshots");
        Ok(removed)
    }

    // Read-only queries. These touch the disk directly and may block.

    pub fn latest(&self, repo: &str) -> TrackerResult<SnapshotBundle> {
        self.ensure_known(repo)?;
        self.state.snapshots.latest(repo)
    }

    pub fn previous(&self, repo: &str) -> TrackerResult<Option<SnapshotBundle>> {
        self.ensure_known(repo)?;
        self.state.snapshots.previous(repo)
    }

    /// Delta between the two most recent snapshots, `None` with fewer than two.
    pub fn delta(&self, repo: &str) -> TrackerResult<Option<SnapshotDelta>> {
        let latest = self.latest(repo)?;
        Ok(self
            .previous(repo)?
            .map(|previous| compare(&previous, &latest)))
    }

    pub fn documents(&self, repo: &str) -> TrackerResult<Vec<WorkDocument>> {
        self.ensure_known(repo)?;
        self.state.work.load_all(repo)
    }

    pub fn document(&self, repo: &str, id: &str) -> TrackerResult<WorkDocument> {
        self.ensure_known(repo)?;
        self.state
            .work
            .load(repo, id)?
            .ok_or_else(|| TrackerError::WorkDocumentNotFound {
                repo: repo.to_string(),
                id: id.to_string(),
            })
    }

    /// Documents that qualify for escalation right now
    pub fn escalations(&self, repo: &str) -> TrackerResult<Vec<WorkDocument>> {
        let docs = self.documents(repo)?;
        Ok(detect_escalations(&docs).into_iter().cloned().collect())
    }

    /// Alerts written so far
    pub fn alerts(&self, repo: &str) -> TrackerResult<Vec<AlertPayload>> {
        self.ensure_known(repo)?;
        self.state.alerts.list(repo)
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("data_dir", &self.data_dir())
            .field("repos", &self.repos)
            .finish()
    }
}

impl TrackerState {
    fn lock(&self, repo: &str) -> TrackerResult<RepoLock> {
        lock_repo(self.snapshots.data_dir(), repo)
    }

    fn apply_scan(
        &self,
        repo: &str,
        bundle: SnapshotBundle,
        findings: &[FindingInstance],
        now: DateTime<Utc>,
    ) -> TrackerResult<ScanOutcome> {
        self.snapshots.ensure_new(repo, &bundle.timestamp)?;

        let previous = self.previous_bundle(repo)?;
        let delta = previous.as_ref().map(|p| compare(p, &bundle));

        let mut outcome = ScanOutcome {
            repo: repo.to_string(),
            timestamp: bundle.timestamp.clone(),
            delta,
            ..Default::default()
        };

        let mut existing: HashMap<String, WorkDocument> = self
            .work
            .load_all(repo)?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();

        // Pre-scan state of every touched document, `None` for created ones
        let mut originals: Vec<(String, Option<WorkDocument>)> = Vec::new();
        let mut seen = HashSet::new();
        for finding in findings {
            let id = finding.id();
            if !seen.insert(id.clone()) {
                debug!(repo = repo, id = %id, code = %finding.code, "Duplicate finding in scan, skipped");
                continue;
            }

            let original = existing.remove(&id);
            originals.push((id.clone(), original.clone()));
            let (doc, observation) = work::observe(original, finding, &self.engine, now);

            match observation {
                Observation::Created => outcome.created.push(id),
                Observation::Updated { change } => {
                    outcome.updated.push(id);
                    outcome.severity_changes.extend(change);
                }
                Observation::Reopened { change } => {
                    outcome.reopened.push(id.clone());
                    outcome.updated.push(id);
                    outcome.severity_changes.extend(change);
                }
            }
            outcome.documents.push(doc);
        }

        outcome.missing = existing
            .values()
            .filter(|d| d.is_open())
            .map(|d| d.id.clone())
            .collect();
        outcome.missing.sort();

        let mut all = outcome.documents.clone();
        all.extend(existing.into_values());

        match self.commit_scan(repo, &bundle, &outcome.documents, &all, now) {
            Ok(escalations) => {
                outcome.escalations = escalations;
                Ok(outcome)
            }
            Err(e) => {
                self.restore_documents(repo, &originals);
                Err(e)
            }
        }
    }

    /// Newest stored bundle, or `None` when history is empty.
    ///
    /// An unreadable newest bundle only costs this scan its delta.
    fn previous_bundle(&self, repo: &str) -> TrackerResult<Option<SnapshotBundle>> {
        match self.snapshots.latest(repo) {
            Ok(bundle) => Ok(Some(bundle)),
            Err(e) if e.is_missing_history() => Ok(None),
            Err(e @ (TrackerError::SectionLoad { .. } | TrackerError::Corrupt { .. })) => {
                warn!(repo = repo, error = %e, "Previous snapshot unreadable, scan has no delta");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn commit_scan(
        &self,
        repo: &str,
        bundle: &SnapshotBundle,
        changed: &[WorkDocument],
        all: &[WorkDocument],
        now: DateTime<Utc>,
    ) -> TrackerResult<Vec<EscalationRecord>> {
        for doc in changed {
            self.work.save(repo, doc)?;
        }
        let escalations = self.write_alerts(repo, all, now)?;
        self.snapshots.save(repo, bundle)?;
        Ok(escalations)
    }

    /// Put touched documents back the way the scan found them.
    /// Alerts are left as written; the next qualifying scan overwrites them.
    fn restore_documents(&self, repo: &str, originals: &[(String, Option<WorkDocument>)]) {
        for (id, original) in originals {
            let restored = match original {
                Some(doc) => self.work.save(repo, doc).map(|_| ()),
                None => self.work.remove(repo, id),
            };
            if let Err(e) = restored {
                warn!(repo = repo, id = %id, error = %e, "Failed to roll back work document");
            }
        }
        if !originals.is_empty() {
            warn!(repo = repo, documents = originals.len(), "Scan failed, work documents rolled back");
        }
    }

    fn write_alerts(
        &self,
        repo: &str,
        docs: &[WorkDocument],
        now: DateTime<Utc>,
    ) -> TrackerResult<Vec<EscalationRecord>> {
        detect_escalations(docs)
            .into_iter()
            .map(|doc| {
                let (alert, path) = self.alerts.write_alert(repo, doc, now)?;
                Ok(EscalationRecord { alert, path })
            })
            .collect()
    }
}

fn document_event(slug: &str, doc: &WorkDocument) -> LiveEvent {
    LiveEvent::new(
        EventKind::WorkUpdate,
        slug,
        json!({ "event": "document", "document": doc }),
    )
}
