//! Trend inference
//!
//! Compares the numeric signal in the finding's latest summary with the one
//! recorded in the document's most recent `Report update:` note.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{FindingInstance, Trend};
use crate::work::WorkDocument;

/// Extracts a comparable number from free text.
///
/// Summaries are free text today ("14 TODOs across 3 files"). A collector
/// that emits a structured metric can plug in its own extractor without
/// touching the state machine.
pub trait SignalExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// The comparison value, or `None` when the text carries no signal
    fn extract(&self, text: &str) -> Option<f64>;
}

/// First run of ASCII digits (with an optional decimal part) wins.
///
/// "line 42: 3 issues" yields 42. Ambiguous, but it is the historical
/// behavior and summaries are written with the metric first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstNumber;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("valid number regex"))
}

impl SignalExtractor for FirstNumber {
    fn name(&self) -> &'static str {
        "first-number"
    }

    fn extract(&self, text: &str) -> Option<f64> {
        number_pattern()
            .find(text)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

/// Infer the trend of `doc` given the finding reported this scan.
///
/// - no recurrence counted yet: `New`
/// - either side without a number: `Stable` (missing signal is never change)
/// - otherwise compare current against the last report
pub fn compute_trend(
    doc: &WorkDocument,
    current: &FindingInstance,
    extractor: &dyn SignalExtractor,
) -> Trend {
    if doc.consecutive_reports == 0 {
        return Trend::New;
    }

    let previous = doc
        .latest_report()
        .and_then(|note| note.report_body())
        .and_then(|body| extractor.extract(body));
    let current = extractor.extract(&current.summary);

    match (previous, current) {
        (Some(prev), Some(curr)) if curr > prev => Trend::Worsening,
        (Some(prev), Some(curr)) if curr < prev => Trend::Improving,
        _ => Trend::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricCategory, Severity};
    use crate::work::test_support::doc;
    use chrono::Utc;

    fn finding(summary: &str) -> FindingInstance {
        FindingInstance::new("WD-M2-001", MetricCategory::DebtMarkers, summary)
    }

    fn doc_with_report(report: &str, consecutive: u32) -> WorkDocument {
        let mut d = doc(Severity::S3, Trend::Stable, consecutive);
        d.push_note(report, Utc::now());
        d
    }

    #[test]
    fn test_first_number_extraction() {
        let x = FirstNumber;
        assert_eq!(x.extract("14 TODOs"), Some(14.0));
        assert_eq!(x.extract("coverage at 71.5% (was 80)"), Some(71.5));
        assert_eq!(x.extract("line 42: 3 issues"), Some(42.0));
        assert_eq!(x.extract("see details"), None);
        // Non-ASCII digits are not part of the signal
        assert_eq!(x.extract("٣ modules, 5 cycles"), Some(5.0));
        assert_eq!(x.extract("٣٤ modules"), None);
        assert_eq!(x.extract(""), None);
    }

    #[test]
    fn test_zero_reports_is_always_new() {
        let d = doc_with_report("Report update: 1 TODO", 0);
        assert_eq!(compute_trend(&d, &finding("500 TODOs"), &FirstNumber), Trend::New);
        assert_eq!(compute_trend(&d, &finding("no number"), &FirstNumber), Trend::New);
    }

    #[test]
    fn test_worsening_improving_stable() {
        let d = doc_with_report("Report update: 10 TODOs", 2);
        assert_eq!(compute_trend(&d, &finding("12 TODOs"), &FirstNumber), Trend::Worsening);
        assert_eq!(compute_trend(&d, &finding("8 TODOs"), &FirstNumber), Trend::Improving);
        assert_eq!(compute_trend(&d, &finding("10 TODOs"), &FirstNumber), Trend::Stable);
    }

    #[test]
    fn test_missing_number_on_either_side_is_stable() {
        let d = doc_with_report("Report update: see details", 1);
        assert_eq!(compute_trend(&d, &finding("3 issues found"), &FirstNumber), Trend::Stable);

        let d = doc_with_report("Report update: 3 issues found", 1);
        assert_eq!(compute_trend(&d, &finding("issues found"), &FirstNumber), Trend::Stable);
    }

    #[test]
    fn test_initial_assignment_note_is_not_a_baseline() {
        // Only a non-report note exists: the "1" in it must not be compared
        let mut d = doc(Severity::S3, Trend::New, 1);
        d.push_note("Initial severity S1 assigned from code table", Utc::now());
        assert_eq!(compute_trend(&d, &finding("9 cycles"), &FirstNumber), Trend::Stable);
    }

    #[test]
    fn test_latest_report_is_the_baseline() {
        let mut d = doc(Severity::S3, Trend::Stable, 2);
        let now = Utc::now();
        d.push_note("Report update: 50 TODOs", now);
        d.push_note("Report update: 5 TODOs", now);
        d.push_note("Severity demoted S3 -> S4 after 2 improving reports", now);
        assert_eq!(compute_trend(&d, &finding("6 TODOs"), &FirstNumber), Trend::Worsening);
    }

    struct Fixed(Option<f64>);

    impl SignalExtractor for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn extract(&self, _text: &str) -> Option<f64> {
            self.0
        }
    }

    #[test]
    fn test_custom_extractor_is_used() {
        let d = doc_with_report("Report update: 1", 1);
        assert_eq!(compute_trend(&d, &finding("999"), &Fixed(Some(1.0))), Trend::Stable);
        assert_eq!(compute_trend(&d, &finding("999"), &Fixed(None)), Trend::Stable);
    }
}
