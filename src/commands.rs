//! CLI command definitions
//!
//! Defines the clap commands for the sls tools.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Restart the gotthardDetectorServer on a detector controller
    ///
    /// Lists processes over telnet and kills the server; the controller's
    /// init respawns it.
    Restart {
        /// Detector controller hostname (prints usage if omitted)
        hostname: Option<String>,

        /// Telnet port (default: 23)
        #[arg(long)]
        port: Option<u16>,

        /// Connection timeout in seconds (default: 5)
        #[arg(long)]
        timeout: Option<u64>,

        /// Per-line read timeout in seconds (default: 1)
        #[arg(long)]
        read_timeout: Option<u64>,

        /// Substring identifying the process in `ps` output
        #[arg(long)]
        process: Option<String>,

        /// Pause after sending kill, in milliseconds (default: 1000)
        #[arg(long)]
        settle_ms: Option<u64>,
    },

    /// Start the detector server and check its startup log
    Smoke {
        /// Scenarios to run (default: all)
        names: Vec<String>,

        /// Load additional scenarios from a YAML file
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Detector server binary (default: karabo-sls-detector-server)
        #[arg(long)]
        server: Option<String>,

        /// Seconds the server may run before it is killed (default: 10)
        #[arg(long)]
        timeout: Option<u64>,

        /// List available scenarios and exit
        #[arg(long)]
        list: bool,

        /// Show the command line and captured output of every scenario
        #[arg(long, short)]
        verbose: bool,
    },
}
