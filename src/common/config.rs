//! Configuration file handling

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Remote restart settings
    #[serde(default)]
    pub restart: RestartConfig,

    /// Smoke test settings
    #[serde(default)]
    pub smoke: SmokeConfig,
}

/// Settings for `sls-tools restart`
#[derive(Debug, Deserialize, Clone)]
pub struct RestartConfig {
    /// Telnet port on the detector controller
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long to wait for each `ps` line before giving up
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Substring identifying the process to kill in `ps` output
    #[serde(default = "default_process")]
    pub process: String,

    /// Pause after sending `kill`, before the session is dropped
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            process: default_process(),
            settle_ms: default_settle(),
        }
    }
}

fn default_port() -> u16 {
    23
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_read_timeout() -> u64 {
    1
}
fn default_process() -> String {
    "/gotthardDetectorServer -phaseshift 55".to_string()
}
fn default_settle() -> u64 {
    1000
}

/// Settings for `sls-tools smoke`
#[derive(Debug, Deserialize, Clone)]
pub struct SmokeConfig {
    /// Detector server binary, looked up in PATH
    #[serde(default = "default_server")]
    pub server: String,

    /// Overall run time allowed for the server before it is killed
    #[serde(default = "default_smoke_timeout")]
    pub timeout_secs: u64,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            timeout_secs: default_smoke_timeout(),
        }
    }
}

fn default_server() -> String {
    "karabo-sls-detector-server".to_string()
}
fn default_smoke_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
