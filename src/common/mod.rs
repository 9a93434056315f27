//! Common utilities shared between the restart and smoke commands

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Strip trailing newlines (both `\n` and `\r\n`) from captured output
pub fn trim_trailing_newlines(text: &str) -> &str {
    text.trim_end_matches(['\n', '\r'])
}
