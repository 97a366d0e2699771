//! Escalation monitor
//!
//! A document escalates while it sits at S1, has been reported at least
//! three times, and nobody has picked it up. Detection is a pure filter that
//! is re-run every scan; an escalated document that stays unassigned is
//! alerted again on the next scan and its alert file overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::{validate_key, TrackerResult};
use crate::models::{Severity, Status};
use crate::storage::{list_json_files, paths, read_json, write_json_atomic};
use crate::work::WorkDocument;

/// Reports an S1 document needs before it escalates
pub const ESCALATION_MIN_REPORTS: u32 = 3;

/// Documents that need an alert, in input order.
pub fn detect_escalations(docs: &[WorkDocument]) -> Vec<&WorkDocument> {
    docs.iter().filter(|d| needs_escalation(d)).collect()
}

pub fn needs_escalation(doc: &WorkDocument) -> bool {
    doc.severity == Severity::S1
        && doc.consecutive_reports >= ESCALATION_MIN_REPORTS
        && doc.status == Status::Unassigned
}

/// Snapshot of a work document at the moment it escalated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub finding_id: String,
    pub code: String,
    pub severity: Severity,
    pub consecutive_reports: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub escalated_at: DateTime<Utc>,
}

impl AlertPayload {
    pub fn from_document(doc: &WorkDocument, escalated_at: DateTime<Utc>) -> Self {
        Self {
            finding_id: doc.id.clone(),
            code: doc.code.clone(),
            severity: doc.severity,
            consecutive_reports: doc.consecutive_reports,
            path: doc.path.clone(),
            escalated_at,
        }
    }
}

/// Alert records at `<data>/<slug>/alerts/<finding-id>.json`
#[derive(Debug, Clone)]
pub struct AlertStore {
    data_dir: PathBuf,
}

impl AlertStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Persist the alert for `doc`, replacing any earlier one. Returns its path.
    pub fn write_alert(
        &self,
        repo: &str,
        doc: &WorkDocument,
        escalated_at: DateTime<Utc>,
    ) -> TrackerResult<(AlertPayload, PathBuf)> {
        validate_key("repository slug", repo)?;
        validate_key("finding id", &doc.id)?;

        let payload = AlertPayload::from_document(doc, escalated_at);
        let path = paths::alert_path(&self.data_dir, repo, &doc.id);
        write_json_atomic(&path, &payload)?;

        info!(
            repo = repo,
            id = %doc.id,
            code = %doc.code,
            reports = doc.consecutive_reports,
            "Escalation raised"
        );
        Ok((payload, path))
    }

    /// Alerts written so far, ordered by finding id. Unreadable files are skipped.
    pub fn list(&self, repo: &str) -> TrackerResult<Vec<AlertPayload>> {
        validate_key("repository slug", repo)?;
        let mut alerts = Vec::new();
        for path in list_json_files(&paths::alerts_dir(&self.data_dir, repo))? {
            match read_json::<AlertPayload>(&path) {
                Ok(Some(alert)) => alerts.push(alert),
                Ok(None) => {}
                Err(e) => warn!("Skipping alert {}: {}", path.display(), e),
            }
        }
        Ok(alerts)
    }
}
