//! CLI command definitions and handlers

mod escalations;
mod ingest;
mod init;
mod snapshots;
mod status;
mod work;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::{style, StyledObject};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

use driftwatch::config::{load_config, TrackerConfig};
use driftwatch::hub::Hub;
use driftwatch::models::Severity;
use driftwatch::Tracker;

/// Driftwatch - track code-health findings across scans
#[derive(Parser, Debug)]
#[command(name = "driftwatch")]
#[command(
    version,
    about = "Track code-health findings across scans: trends, severity and escalation",
    after_help = "\
Examples:
  driftwatch init                                   Write an example driftwatch.toml
  driftwatch ingest web-app --bundle ./out          Record a scan from collector output
  driftwatch status web-app                         Latest snapshot and what changed
  driftwatch work web-app --open                    Open work documents
  driftwatch escalations web-app --write            Write alerts for escalated findings"
)]
pub struct Cli {
    /// Config file (default: ./driftwatch.toml, then the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example driftwatch.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Record one scan: a bundle directory plus the findings it produced
    #[command(after_help = "\
The bundle directory holds one JSON file per section:
  git-stats.json, staleness.json, debt-markers.json       (required)
  complexity.json, imports.json, runtime.json,
  coverage.json, doc-staleness.json                        (optional)

The findings file is a JSON array of {code, category, summary, path?, symbol?}.")]
    Ingest {
        /// Repository slug
        slug: String,

        /// Directory containing the section files
        #[arg(long)]
        bundle: PathBuf,

        /// JSON file with the findings of this scan
        #[arg(long)]
        findings: Option<PathBuf>,

        /// Snapshot key (default: now)
        #[arg(long)]
        timestamp: Option<String>,

        /// Print the scan outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the latest snapshot and its delta to the previous one
    Status {
        slug: String,

        #[arg(long)]
        json: bool,
    },

    /// List snapshot history
    Snapshots {
        slug: String,

        /// Show the newest snapshot taken on this branch
        #[arg(long)]
        branch: Option<String>,

        /// Keep only the newest N snapshots
        #[arg(long)]
        prune: Option<usize>,
    },

    /// List work documents
    Work {
        slug: String,

        /// Hide resolved documents
        #[arg(long)]
        open: bool,

        /// Show notes of a single document
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show documents that qualify for escalation
    Escalations {
        slug: String,

        /// Write alert files for them
        #[arg(long)]
        write: bool,

        #[arg(long)]
        json: bool,
    },

    /// Assign a work document
    Assign {
        slug: String,
        id: String,
        assignee: String,
    },

    /// Mark a work document resolved
    Resolve {
        slug: String,
        id: String,

        /// Why it is resolved
        #[arg(long, default_value = "")]
        reason: String,
    },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { force } = cli.command {
        let cwd = std::env::current_dir().context("Cannot determine working directory")?;
        return init::run(&cwd, force);
    }

    let tracker = open_tracker(cli.config.as_deref())?;
    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Ingest {
            slug,
            bundle,
            findings,
            timestamp,
            json,
        } => ingest::run(&tracker, &slug, &bundle, findings.as_deref(), timestamp, json),
        Commands::Status { slug, json } => status::run(&tracker, &slug, json),
        Commands::Snapshots {
            slug,
            branch,
            prune,
        } => snapshots::run(&tracker, &slug, branch.as_deref(), prune),
        Commands::Work {
            slug,
            open,
            id,
            json,
        } => work::list(&tracker, &slug, open, id.as_deref(), json),
        Commands::Escalations { slug, write, json } => escalations::run(&tracker, &slug, write, json),
        Commands::Assign { slug, id, assignee } => work::assign(&tracker, &slug, &id, &assignee),
        Commands::Resolve { slug, id, reason } => work::resolve(&tracker, &slug, &id, &reason),
    }
}

fn open_tracker(config_path: Option<&Path>) -> Result<Tracker> {
    if let Some(path) = config_path {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }
    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let config: TrackerConfig = load_config(&cwd, config_path);
    if config.repos.is_empty() {
        tracing::warn!("No [[repos]] configured; every command will reject its slug");
    }
    let hub = Arc::new(Hub::new(&config.hub));
    Ok(Tracker::new(&config, hub))
}

/// Drive an async tracker operation from the synchronous CLI
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = Runtime::new().context("Failed to create tokio runtime")?;
    Ok(rt.block_on(future))
}

fn style_severity(severity: Severity) -> StyledObject<String> {
    let s = style(severity.to_string());
    match severity {
        Severity::S0 | Severity::S1 => s.red().bold(),
        Severity::S2 => s.red(),
        Severity::S3 => s.yellow(),
        Severity::S4 => s.cyan(),
        Severity::S5 => s.dim(),
    }
}
