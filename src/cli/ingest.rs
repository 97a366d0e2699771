//! Ingest command - record one scan from collector output

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use driftwatch::models::FindingInstance;
use driftwatch::snapshot::{read_bundle_dir, timestamp_now};
use driftwatch::Tracker;

use super::{block_on, style_severity};

/// Run the ingest command
pub fn run(
    tracker: &Tracker,
    slug: &str,
    bundle_dir: &Path,
    findings_path: Option<&Path>,
    timestamp: Option<String>,
    json: bool,
) -> Result<()> {
    if !bundle_dir.is_dir() {
        anyhow::bail!("Bundle directory not found: {}", bundle_dir.display());
    }
    let timestamp = timestamp.unwrap_or_else(timestamp_now);
    let bundle = read_bundle_dir(bundle_dir, slug, &timestamp)
        .with_context(|| format!("Failed to read bundle from {}", bundle_dir.display()))?;

    let findings = match findings_path {
        Some(path) => load_findings(path)?,
        None => Vec::new(),
    };

    let outcome = block_on(tracker.ingest(slug, bundle, findings))?
        .with_context(|| format!("Failed to ingest scan for '{}'", slug))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "\n{} Recorded snapshot {} for {}\n",
        style("✓").green(),
        style(&outcome.timestamp).cyan(),
        style(slug).bold()
    );
    println!("   {} created", style(outcome.created.len()).cyan());
    println!("   {} updated", style(outcome.updated.len()).cyan());
    if !outcome.reopened.is_empty() {
        println!("   {} reopened", style(outcome.reopened.len()).yellow());
    }
    println!("   {} not reported this scan", style(outcome.missing.len()).dim());

    for change in &outcome.severity_changes {
        println!(
            "   {} {} {} -> {}",
            style("↕").yellow(),
            style(&change.finding_id).dim(),
            style_severity(change.from),
            style_severity(change.to)
        );
    }
    for record in &outcome.escalations {
        println!(
            "   {} {} {} escalated after {} reports ({})",
            style("!").red().bold(),
            style(&record.alert.code).bold(),
            style(&record.alert.finding_id).dim(),
            record.alert.consecutive_reports,
            style(record.path.display()).dim()
        );
    }
    println!();
    Ok(())
}

fn load_findings(path: &Path) -> Result<Vec<FindingInstance>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read findings file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid findings file {}", path.display()))
}
