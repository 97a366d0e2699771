//! Applying observations and human decisions to work documents
//!
//! The severity module decides; this module mutates. Every mutation leaves a
//! note behind so the document explains its own history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{WorkDocument, REPORT_UPDATE_PREFIX};
use crate::models::{FindingInstance, Severity, Status, Trend};
use crate::severity::{evaluate_demotion, evaluate_promotion, SeverityEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Promoted,
    Demoted,
}

/// An automatic severity change applied during an observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityChange {
    pub finding_id: String,
    pub from: Severity,
    pub to: Severity,
    pub direction: ChangeDirection,
}

/// What an observation did to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First sighting; document created
    Created,
    /// Recurrence of an open document
    Updated { change: Option<SeverityChange> },
    /// Recurrence of a resolved document; reopened then updated
    Reopened { change: Option<SeverityChange> },
}

impl Observation {
    pub fn severity_change(&self) -> Option<&SeverityChange> {
        match self {
            Observation::Created => None,
            Observation::Updated { change } | Observation::Reopened { change } => change.as_ref(),
        }
    }
}

/// Create the work document for a first-seen finding.
///
/// Initial severity comes from the table exactly once, here.
pub fn create(finding: &FindingInstance, engine: &SeverityEngine, now: DateTime<Utc>) -> WorkDocument {
    let severity = engine.initial_severity(&finding.code);
    let source = if engine.table().is_known(&finding.code) {
        "code table"
    } else {
        "default for unknown codes"
    };

    let mut doc = WorkDocument {
        id: finding.id(),
        code: finding.code.clone(),
        category: finding.category,
        path: finding.path.clone(),
        symbol: finding.symbol.clone(),
        severity,
        status: Status::Unassigned,
        assignee: None,
        consecutive_reports: 0,
        trend: Trend::New,
        notes: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    doc.push_note(
        format!("Initial severity {} assigned from {}", severity, source),
        now,
    );
    doc
}

/// Record that `finding` was reported again by this scan.
///
/// Order matters: the trend is computed against the previous report note
/// before the new one is appended, and promotion/demotion see the counter
/// as it stood before this recurrence is counted.
pub fn observe(
    existing: Option<WorkDocument>,
    finding: &FindingInstance,
    engine: &SeverityEngine,
    now: DateTime<Utc>,
) -> (WorkDocument, Observation) {
    let Some(mut doc) = existing else {
        return (create(finding, engine, now), Observation::Created);
    };

    let reopened = doc.status == Status::Resolved;
    if reopened {
        doc.status = Status::Unassigned;
        doc.assignee = None;
        doc.consecutive_reports = 0;
        doc.push_note("Reopened: finding reported again after resolution", now);
    }

    doc.trend = engine.compute_trend(&doc, finding);
    doc.category = finding.category;

    let change = apply_severity_policy(&mut doc, now);

    doc.push_note(format!("{} {}", REPORT_UPDATE_PREFIX, finding.summary), now);
    doc.consecutive_reports = doc.consecutive_reports.saturating_add(1);

    debug!(
        id = %doc.id,
        code = %doc.code,
        trend = %doc.trend,
        severity = %doc.severity,
        reports = doc.consecutive_reports,
        "Observed recurring finding"
    );

    let outcome = if reopened {
        Observation::Reopened { change }
    } else {
        Observation::Updated { change }
    };
    (doc, outcome)
}

fn apply_severity_policy(doc: &mut WorkDocument, now: DateTime<Utc>) -> Option<SeverityChange> {
    let (to, direction) = match evaluate_promotion(doc) {
        Some(to) => (to, ChangeDirection::Promoted),
        None => (evaluate_demotion(doc)?, ChangeDirection::Demoted),
    };

    let from = doc.severity;
    let verb = match direction {
        ChangeDirection::Promoted => "promoted",
        ChangeDirection::Demoted => "demoted",
    };
    doc.push_note(
        format!(
            "Severity {} {} -> {}: {} across {} consecutive reports",
            verb, from, to, doc.trend, doc.consecutive_reports
        ),
        now,
    );
    doc.severity = to;

    Some(SeverityChange {
        finding_id: doc.id.clone(),
        from,
        to,
        direction,
    })
}

/// Hand a document to someone. Assigned documents no longer escalate.
pub fn assign(doc: &mut WorkDocument, assignee: &str, now: DateTime<Utc>) {
    doc.status = Status::Assigned;
    doc.assignee = Some(assignee.to_string());
    doc.push_note(format!("Assigned to {}", assignee), now);
}

/// Mark a document resolved. This is the only place the report counter resets.
pub fn resolve(doc: &mut WorkDocument, reason: &str, now: DateTime<Utc>) {
    doc.status = Status::Resolved;
    doc.consecutive_reports = 0;
    let reason = reason.trim();
    if reason.is_empty() {
        doc.push_note("Resolved", now);
    } else {
        doc.push_note(format!("Resolved: {}", reason), now);
    }
}
