//! Severity state machine
//!
//! Three pieces:
//! - [`SeverityTable`]: initial severity per finding code (configuration, not code)
//! - [`trend`]: trend inference from a document's last report note
//! - [`policy`]: bounded auto-promotion and auto-demotion decisions
//!
//! Everything here is a pure decision function. Applying a decision
//! (changing severity, writing notes, counting reports) is done by
//! [`crate::work::observe`].

pub mod policy;
pub mod trend;

pub use policy::{evaluate_demotion, evaluate_promotion, MIN_REPORTS_FOR_CHANGE};
pub use trend::{compute_trend, FirstNumber, SignalExtractor};

use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::models::{FindingInstance, Severity, Trend};
use crate::work::WorkDocument;

/// Severity for codes missing from the table
pub const DEFAULT_SEVERITY: Severity = Severity::S3;

/// Built-in initial severities; config `[severity]` entries override these
const BUILTIN_SEVERITIES: &[(&str, Severity)] = &[
    ("WD-M1-001", Severity::S3), // stale file
    ("WD-M1-002", Severity::S2), // abandoned module
    ("WD-M2-001", Severity::S4), // TODO backlog
    ("WD-M2-002", Severity::S3), // FIXME/HACK marker
    ("WD-M3-001", Severity::S2), // complexity hotspot
    ("WD-M3-002", Severity::S3), // complexity growth
    ("WD-M4-001", Severity::S4), // deep import
    ("WD-M5-001", Severity::S1), // circular import chain
    ("WD-M6-001", Severity::S2), // low coverage
    ("WD-M7-001", Severity::S4), // stale documentation
    ("WD-M8-001", Severity::S2), // end-of-life runtime
];

/// Mapping of finding code to the severity a new work document starts at
#[derive(Debug, Clone)]
pub struct SeverityTable {
    entries: HashMap<String, Severity>,
}

impl SeverityTable {
    /// Built-in table
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_SEVERITIES
                .iter()
                .map(|(code, sev)| (code.to_string(), *sev))
                .collect(),
        }
    }

    /// Table with no entries: every code starts at the default
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Built-in table with per-deployment overrides applied
    pub fn with_overrides(overrides: &BTreeMap<String, Severity>) -> Self {
        let mut table = Self::builtin();
        for (code, sev) in overrides {
            table.insert(code.clone(), *sev);
        }
        table
    }

    /// Set the initial severity of `code`. S0 is reserved for humans and is
    /// clamped to S1.
    pub fn insert(&mut self, code: impl Into<String>, severity: Severity) {
        let code = code.into();
        let severity = if severity < Severity::AUTO_CEILING {
            warn!(
                code = %code,
                requested = %severity,
                "S0 cannot be an initial severity, using {}",
                Severity::AUTO_CEILING
            );
            Severity::AUTO_CEILING
        } else {
            severity
        };
        self.entries.insert(code, severity);
    }

    /// Initial severity for `code`; unknown codes get S3.
    pub fn initial_severity(&self, code: &str) -> Severity {
        self.entries.get(code).copied().unwrap_or(DEFAULT_SEVERITY)
    }

    pub fn is_known(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Severity table plus the signal extractor used for trends
pub struct SeverityEngine {
    table: SeverityTable,
    extractor: Box<dyn SignalExtractor>,
}

impl SeverityEngine {
    pub fn new(table: SeverityTable) -> Self {
        Self {
            table,
            extractor: Box::new(FirstNumber),
        }
    }

    /// Swap the numeric-signal heuristic (e.g. for a structured metric field)
    pub fn with_extractor(mut self, extractor: Box<dyn SignalExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn table(&self) -> &SeverityTable {
        &self.table
    }

    pub fn initial_severity(&self, code: &str) -> Severity {
        self.table.initial_severity(code)
    }

    pub fn compute_trend(&self, doc: &WorkDocument, finding: &FindingInstance) -> Trend {
        compute_trend(doc, finding, self.extractor.as_ref())
    }
}

impl Default for SeverityEngine {
    fn default() -> Self {
        Self::new(SeverityTable::builtin())
    }
}

impl std::fmt::Debug for SeverityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeverityEngine")
            .field("table", &self.table)
            .field("extractor", &self.extractor.name())
            .finish()
    }
}
