//! Configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/stepguard/`
//! - macOS: `~/Library/Application Support/stepguard/`
//! - Windows: `%APPDATA%\stepguard\`

use std::path::{Path, PathBuf};

const APP_NAME: &str = "stepguard";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve a path named inside a scenario relative to the scenario file
pub fn resolve_relative(scenario_dir: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        scenario_dir.join(path)
    } else {
        path.to_path_buf()
    }
}
