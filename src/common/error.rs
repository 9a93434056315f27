//! Error types for the sls tools
//!
//! Messages name the host, command or scenario involved so that an operator
//! can act on them without re-running with debug logging.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sls tools
#[derive(Error, Debug)]
pub enum Error {
    // === Remote shell errors ===
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Timed out connecting to {host}:{port} after {secs} seconds")]
    ConnectTimeout { host: String, port: u16, secs: u64 },

    #[error("Remote shell error: {0}")]
    RemoteShell(String),

    // === Subprocess errors ===
    #[error("Failed to run '{command}': {error}")]
    SpawnFailed { command: String, error: String },

    #[error("Detector server '{0}' not found in PATH")]
    ServerNotFound(String),

    // === Smoke test errors ===
    #[error("Expected output not found: {0}")]
    ExpectationFailed(String),

    #[error("Invalid output pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("Unknown smoke scenario '{0}'. Use 'sls-tools smoke --list' to see available scenarios")]
    UnknownScenario(String),

    #[error("Invalid smoke scenario: {0}")]
    ScenarioParse(String),

    // === Configuration errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a connect failed error for a host and port
    pub fn connect_failed(host: &str, port: u16, source: io::Error) -> Self {
        Self::ConnectFailed {
            host: host.to_string(),
            port,
            source,
        }
    }

    /// Create a spawn failed error
    pub fn spawn_failed(command: &str, error: impl ToString) -> Self {
        Self::SpawnFailed {
            command: command.to_string(),
            error: error.to_string(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: &str, error: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            error: error.to_string(),
        }
    }
}
