//! Status command - latest snapshot and what changed since the previous one

use anyhow::Result;
use console::{style, StyledObject};
use serde_json::json;

use driftwatch::Tracker;

/// Run the status command
pub fn run(tracker: &Tracker, slug: &str, json: bool) -> Result<()> {
    let latest = tracker.latest(slug)?;
    let previous = tracker.previous(slug)?;
    let delta = tracker.delta(slug)?;

    if json {
        let value = json!({
            "slug": slug,
            "latest": latest,
            "previous": previous.as_ref().map(|p| &p.timestamp),
            "delta": delta,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("\n{} Status\n", style(slug).bold());
    println!("  Latest:   {}", style(&latest.timestamp).cyan());
    println!("  Branch:   {}", style(&latest.git_stats.branch).cyan());
    match &previous {
        Some(p) => println!("  Previous: {}", style(&p.timestamp).dim()),
        None => println!("  Previous: {}", style("none").dim()),
    }
    let optional = latest.optional_sections();
    if !optional.is_empty() {
        println!("  Sections: {}", style(optional.join(", ")).dim());
    }
    println!();

    println!(
        "  {} commits, {} stale files, {} TODOs, {} FIXMEs, {} HACKs",
        style(latest.git_stats.commit_count).cyan(),
        style(latest.staleness.summary.stale_files).cyan(),
        style(latest.debt_markers.summary.total_todos).cyan(),
        style(latest.debt_markers.summary.total_fixmes).cyan(),
        style(latest.debt_markers.summary.total_hacks).cyan(),
    );

    let Some(delta) = delta else {
        println!("\n  {}", style("Only one snapshot so far; no delta yet").dim());
        println!();
        return Ok(());
    };

    println!("\n{}", style("Changes since previous").bold());
    if delta.is_unchanged() {
        println!("   {}", style("no change").dim());
    }
    for (name, value) in delta.measured() {
        if value == 0 {
            continue;
        }
        println!("   {:<22} {}", name, style_change(name, value));
    }
    println!();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Neutral,
    Regression,
    Improvement,
}

/// Commits and contributors grow on a healthy repository too
fn change_tone(name: &str, value: i64) -> Tone {
    match name {
        "commits" | "contributors" => Tone::Neutral,
        _ if value > 0 => Tone::Regression,
        _ => Tone::Improvement,
    }
}

fn style_change(name: &str, value: i64) -> StyledObject<String> {
    let text = if value > 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    };
    match change_tone(name, value) {
        Tone::Neutral => style(text).cyan(),
        Tone::Regression => style(text).red(),
        Tone::Improvement => style(text).green(),
    }
}
