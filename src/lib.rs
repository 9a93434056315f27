//! Operational tools for SLS detector servers
//!
//! Remote restart of a detector server over telnet, and smoke tests that
//! start the Karabo detector server and check its startup log.

pub mod cli;
pub mod commands;
pub mod common;
pub mod restart;
pub mod smoke;
pub mod telnet;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use restart::{RestartOptions, RestartOutcome};
