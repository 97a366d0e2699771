//! Configuration module for driftwatch
//!
//! This module handles:
//! - Tracker configuration (driftwatch.toml)
//! - The repository registry
//! - Initial severity overrides per finding code
//! - Hub settings

mod project_config;

pub use project_config::{
    default_data_dir,
    load_config,
    user_config_path,
    HubConfig,
    RepoConfig,
    TrackerConfig,
    CONFIG_FILE_NAME,
    DATA_DIR_ENV,
    EXAMPLE_CONFIG,
};
