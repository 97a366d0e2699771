//! Tracker configuration support
//!
//! Loads configuration from `driftwatch.toml` in the working directory, falling
//! back to the user-level `~/.config/driftwatch/config.toml`.
//!
//! # Configuration Format
//!
//! ```toml
//! # driftwatch.toml
//!
//! data_dir = "/var/lib/driftwatch"
//!
//! [[repos]]
//! slug = "web-app"
//! path = "../web-app"
//! branch = "main"
//!
//! [severity]
//! "WD-M2-001" = "S3"   # Override the default severity of a finding code
//!
//! [hub]
//! channel_capacity = 128
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::Severity;

/// File name searched for in the working directory
pub const CONFIG_FILE_NAME: &str = "driftwatch.toml";

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "DRIFTWATCH_DATA_DIR";

/// Top-level tracker configuration loaded from driftwatch.toml
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TrackerConfig {
    /// Root directory for snapshots, work documents and alerts
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Repositories this deployment tracks
    #[serde(default)]
    pub repos: Vec<RepoConfig>,

    /// Per-code initial severity overrides
    #[serde(default)]
    pub severity: BTreeMap<String, Severity>,

    /// Live update hub settings
    #[serde(default)]
    pub hub: HubConfig,
}

/// One tracked repository
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RepoConfig {
    /// Identifier used as storage key and subscription key
    pub slug: String,

    /// Location of the working copy (informational, used by collectors)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Branch the dashboard follows by default
    #[serde(default)]
    pub branch: Option<String>,
}

/// Live update hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Per-observer queue length before events are dropped (default: 64)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    64
}

impl TrackerConfig {
    /// Effective data directory (env > config file > platform data dir)
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        default_data_dir()
    }

    /// Slugs of all configured repositories
    pub fn repo_slugs(&self) -> HashSet<String> {
        self.repos.iter().map(|r| r.slug.clone()).collect()
    }

    /// Look up a configured repository by slug
    pub fn repo(&self, slug: &str) -> Option<&RepoConfig> {
        self.repos.iter().find(|r| r.slug == slug)
    }

    /// Register a repository programmatically (used by embedders and tests)
    pub fn with_repo(mut self, slug: impl Into<String>) -> Self {
        self.repos.push(RepoConfig {
            slug: slug.into(),
            path: None,
            branch: None,
        });
        self
    }

    /// Set the data directory programmatically
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }
}

/// Platform data directory: ~/.local/share/driftwatch on Linux
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("driftwatch")
}

/// User-level config path (~/.config/driftwatch/config.toml)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("driftwatch").join("config.toml"))
}

/// Load tracker configuration.
///
/// Searches in this order:
/// 1. an explicit path, if given
/// 2. `driftwatch.toml` in `dir`
/// 3. the user config file
///
/// Returns default configuration if nothing loads.
pub fn load_config(dir: &Path, explicit: Option<&Path>) -> TrackerConfig {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    candidates.push(dir.join(CONFIG_FILE_NAME));
    if let Some(user) = user_config_path() {
        candidates.push(user);
    }

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_toml_config(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    TrackerConfig::default()
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> anyhow::Result<TrackerConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TrackerConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Example file written by `driftwatch init`
pub const EXAMPLE_CONFIG: &str = r#"# driftwatch configuration

# Where snapshots, work documents and alerts are stored.
# Defaults to the platform data directory; DRIFTWATCH_DATA_DIR overrides.
# data_dir = ".driftwatch"

[[repos]]
slug = "my-repo"
path = "."
branch = "main"

# Initial severity per finding code (S1 most urgent .. S5 least; S0 is clamped to S1).
# Unknown codes start at S3.
[severity]
# "WD-M2-001" = "S3"

[hub]
channel_capacity = 64
"#;
