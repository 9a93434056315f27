//! Configuration file location
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/sls-tools/`
//! - macOS: `~/Library/Application Support/sls-tools/`

use std::path::PathBuf;

/// Application name used for the config directory
const APP_NAME: &str = "sls-tools";

/// Environment variable overriding the config file path
pub const CONFIG_ENV: &str = "SLS_TOOLS_CONFIG";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// `SLS_TOOLS_CONFIG` wins over the platform default.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    config_dir().map(|dir| dir.join("config.toml"))
}
