//! Work documents: the durable record of a finding across scans
//!
//! A work document is created the first time a finding is observed and is
//! updated on every scan that reports it again. Notes are append-only; the
//! most recent `Report update:` note is the baseline the trend engine
//! compares the next report against.

mod lifecycle;
mod store;

pub use lifecycle::{assign, create, observe, resolve, ChangeDirection, Observation, SeverityChange};
pub use store::WorkStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MetricCategory, Severity, Status, Trend};

/// Prefix of the notes that snapshot a finding's summary on each recurrence
pub const REPORT_UPDATE_PREFIX: &str = "Report update:";

/// One entry in a work document's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

impl Note {
    pub fn is_report_update(&self) -> bool {
        self.text.starts_with(REPORT_UPDATE_PREFIX)
    }

    /// Note body without the `Report update:` prefix
    pub fn report_body(&self) -> Option<&str> {
        self.text
            .strip_prefix(REPORT_UPDATE_PREFIX)
            .map(str::trim_start)
    }
}

/// Persistent tracking record for one finding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkDocument {
    /// Stable identity derived from code + location
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub category: MetricCategory,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub assignee: Option<String>,
    /// Recurrences since creation or reopening; reset only on resolution
    #[serde(default)]
    pub consecutive_reports: u32,
    #[serde(default)]
    pub trend: Trend,
    #[serde(default)]
    pub notes: Vec<Note>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkDocument {
    /// The most recent `Report update:` note, if any.
    ///
    /// Other notes (initial assignment, severity rationale, assignment) are
    /// never a trend baseline.
    pub fn latest_report(&self) -> Option<&Note> {
        self.notes.iter().rev().find(|n| n.is_report_update())
    }

    pub fn is_open(&self) -> bool {
        self.status != Status::Resolved
    }

    pub(crate) fn push_note(&mut self, text: impl Into<String>, at: DateTime<Utc>) {
        self.notes.push(Note {
            text: text.into(),
            recorded_at: at,
        });
        self.updated_at = at;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Bare document for decision-function tests
    pub fn doc(severity: Severity, trend: Trend, consecutive_reports: u32) -> WorkDocument {
        let now = Utc::now();
        WorkDocument {
            id: "0000000000000000".to_string(),
            code: "WD-TEST-001".to_string(),
            category: MetricCategory::DebtMarkers,
            path: None,
            symbol: None,
            severity,
            status: Status::Unassigned,
            assignee: None,
            consecutive_reports,
            trend,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
