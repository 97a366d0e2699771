//! Auto-promotion and auto-demotion
//!
//! Both are gated on a sustained trend: one recurrence is not evidence, so a
//! document needs at least two counted reports before severity moves.
//! Promotion stops at S1 (S0 is manual only); demotion stops at S4.

use crate::models::{Severity, Trend};
use crate::work::WorkDocument;

/// Reports needed before a trend may move severity
pub const MIN_REPORTS_FOR_CHANGE: u32 = 2;

/// Severity one level more urgent, or `None` for no change.
pub fn evaluate_promotion(doc: &WorkDocument) -> Option<Severity> {
    if doc.trend != Trend::Worsening || doc.consecutive_reports < MIN_REPORTS_FOR_CHANGE {
        return None;
    }
    if doc.severity <= Severity::AUTO_CEILING {
        return None;
    }
    Some(doc.severity.more_urgent())
}

/// Severity one level less urgent, or `None` for no change.
pub fn evaluate_demotion(doc: &WorkDocument) -> Option<Severity> {
    if doc.trend != Trend::Improving || doc.consecutive_reports < MIN_REPORTS_FOR_CHANGE {
        return None;
    }
    if doc.severity >= Severity::AUTO_FLOOR {
        return None;
    }
    Some(doc.severity.less_urgent())
}
