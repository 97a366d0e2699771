//! Driftwatch - finding lifecycle tracking for code-health scans
//!
//! Turns per-scan metric bundles into durable work documents whose severity
//! follows the finding's trend, raises alerts when critical findings persist,
//! and pushes lifecycle events to live observers.

pub mod config;
pub mod delta;
pub mod error;
pub mod escalation;
pub mod hub;
pub mod models;
pub mod pipeline;
pub mod severity;
pub mod snapshot;
pub mod storage;
pub mod work;

pub use error::{TrackerError, TrackerResult};
pub use pipeline::{ScanOutcome, Tracker};
