//! Detector server smoke tests
//!
//! Start `karabo-sls-detector-server` with a single device configuration,
//! capture its console, and look for the device startup log line.

mod config;
pub mod process;
mod runner;

pub use config::*;
pub use process::{run_cmd, CommandOutput};
pub use runner::{locate_server, run_all, run_scenario, SmokeOptions, SmokeReport};
