//! Escalations command - documents that need a human now

use anyhow::{Context, Result};
use console::style;

use driftwatch::Tracker;

use super::{block_on, style_severity};

/// Run the escalations command
pub fn run(tracker: &Tracker, slug: &str, write: bool, json: bool) -> Result<()> {
    if write {
        let records = block_on(tracker.raise_escalations(slug))?
            .with_context(|| format!("Failed to write alerts for '{}'", slug))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }
        for record in &records {
            println!(
                "{} {} -> {}",
                style("!").red().bold(),
                style(&record.alert.finding_id).cyan(),
                style(record.path.display()).dim()
            );
        }
        println!("{} alert(s) written", style(records.len()).cyan());
        return Ok(());
    }

    let pending = tracker.escalations(slug)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }
    if pending.is_empty() {
        println!("{} Nothing to escalate for {}", style("✓").green(), style(slug).bold());
        return Ok(());
    }

    println!(
        "\n{} finding(s) at S1 for 3+ reports with nobody assigned\n",
        style(pending.len()).red().bold()
    );
    for doc in &pending {
        println!(
            "  {} {} {} {}x  {}",
            style_severity(doc.severity),
            style(&doc.id).dim(),
            style(&doc.code).bold(),
            doc.consecutive_reports,
            style(doc.path.as_deref().unwrap_or("-")).dim()
        );
    }
    println!(
        "\n   Run {} to take one",
        style(format!("driftwatch assign {} <id> <who>", slug)).cyan()
    );
    println!();
    Ok(())
}
