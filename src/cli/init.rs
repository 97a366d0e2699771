//! Init command - write an example driftwatch.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use driftwatch::config::{CONFIG_FILE_NAME, EXAMPLE_CONFIG};

/// Run the init command
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use {} to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan(),
            style("--force").yellow()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    println!("\n{}", style("Next steps").bold());
    println!("   • Add your repositories under {}", style("[[repos]]").cyan());
    println!(
        "   • Record a scan with {}",
        style("driftwatch ingest <slug> --bundle <dir>").cyan()
    );
    Ok(())
}
