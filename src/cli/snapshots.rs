//! Snapshots command - list, look up by branch, prune

use anyhow::Result;
use console::style;

use driftwatch::Tracker;

use super::block_on;

/// Run the snapshots command
pub fn run(tracker: &Tracker, slug: &str, branch: Option<&str>, prune: Option<usize>) -> Result<()> {
    if !tracker.is_known(slug) {
        return Err(driftwatch::TrackerError::UnknownRepository(slug.to_string()).into());
    }
    if let Some(keep) = prune {
        let removed = block_on(tracker.prune(slug, keep))??;
        println!(
            "{} Removed {} snapshot(s), kept the newest {}",
            style("✓").green(),
            style(removed).cyan(),
            keep
        );
        return Ok(());
    }

    let store = tracker.snapshots();
    if let Some(branch) = branch {
        let bundle = store.latest_for_branch(slug, branch)?;
        println!(
            "{} (branch {}, {} commits)",
            style(&bundle.timestamp).cyan(),
            style(branch).bold(),
            bundle.git_stats.commit_count
        );
        return Ok(());
    }

    let timestamps = store.timestamps(slug)?;
    if timestamps.is_empty() {
        println!(
            "No snapshots for {}. Run {}",
            style(slug).bold(),
            style(format!("driftwatch ingest {} --bundle <dir>", slug)).cyan()
        );
        return Ok(());
    }
    for (i, ts) in timestamps.iter().enumerate() {
        let marker = if i == 0 { style("latest").green() } else { style("").dim() };
        println!("{:>3}. {} {}", style(i + 1).dim(), ts, marker);
    }
    Ok(())
}
