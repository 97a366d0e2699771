//! Work commands - list, assign and resolve work documents

use anyhow::{Context, Result};
use console::style;

use driftwatch::models::{Status, Trend};
use driftwatch::work::WorkDocument;
use driftwatch::Tracker;

use super::{block_on, style_severity};

/// List documents, or show one in detail
pub fn list(tracker: &Tracker, slug: &str, open_only: bool, id: Option<&str>, json: bool) -> Result<()> {
    if let Some(id) = id {
        let doc = tracker.document(slug, id)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            print_detail(&doc);
        }
        return Ok(());
    }

    let mut docs = tracker.documents(slug)?;
    if open_only {
        docs.retain(WorkDocument::is_open);
    }
    // Most urgent first, then longest running
    docs.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(b.consecutive_reports.cmp(&a.consecutive_reports))
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }

    if docs.is_empty() {
        println!("No work documents for {}", style(slug).bold());
        return Ok(());
    }

    println!("\n{} work documents for {}\n", style(docs.len()).cyan(), style(slug).bold());
    for doc in &docs {
        println!(
            "  {} {} {} {:<10} {:<10} {}x  {}",
            style_severity(doc.severity),
            style(&doc.id).dim(),
            style(&doc.code).bold(),
            trend_label(doc.trend),
            status_label(doc),
            doc.consecutive_reports,
            style(doc.path.as_deref().unwrap_or("-")).dim()
        );
    }
    println!();
    Ok(())
}

pub fn assign(tracker: &Tracker, slug: &str, id: &str, assignee: &str) -> Result<()> {
    let doc = block_on(tracker.assign(slug, id, assignee))?
        .with_context(|| format!("Failed to assign {}", id))?;
    println!(
        "{} {} assigned to {}",
        style("✓").green(),
        style(&doc.id).cyan(),
        style(assignee).bold()
    );
    Ok(())
}

pub fn resolve(tracker: &Tracker, slug: &str, id: &str, reason: &str) -> Result<()> {
    let doc = block_on(tracker.resolve(slug, id, reason))?
        .with_context(|| format!("Failed to resolve {}", id))?;
    println!("{} {} resolved", style("✓").green(), style(&doc.id).cyan());
    Ok(())
}

fn trend_label(trend: Trend) -> String {
    let label = trend.to_string();
    match trend {
        Trend::Worsening => style(label).red().to_string(),
        Trend::Improving => style(label).green().to_string(),
        Trend::Stable | Trend::New => style(label).dim().to_string(),
    }
}

fn status_label(doc: &WorkDocument) -> String {
    match (&doc.status, &doc.assignee) {
        (Status::Assigned, Some(who)) => format!("@{}", who),
        (status, _) => status.to_string(),
    }
}

fn print_detail(doc: &WorkDocument) {
    println!();
    println!("{} {}", style(&doc.code).bold(), style(&doc.id).dim());
    println!();
    println!("   {} {}", style("Severity:").bold(), style_severity(doc.severity));
    println!("   {} {}", style("Trend:").bold(), doc.trend);
    println!("   {} {}", style("Status:").bold(), status_label(doc));
    println!("   {} {}", style("Reports:").bold(), doc.consecutive_reports);
    println!("   {} {}", style("Category:").bold(), doc.category);
    if let Some(path) = &doc.path {
        println!("   {} {}", style("Path:").bold(), path);
    }
    if let Some(symbol) = &doc.symbol {
        println!("   {} {}", style("Symbol:").bold(), symbol);
    }

    println!();
    println!("{}", style("Notes").bold());
    for note in &doc.notes {
        println!(
            "   {} {}",
            style(note.recorded_at.format("%Y-%m-%d %H:%M")).dim(),
            note.text
        );
    }
    println!();
}
