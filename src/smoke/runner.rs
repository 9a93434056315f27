//! Smoke scenario runner
//!
//! Starts the detector server once per scenario and checks its console
//! output. A server that is still running when the timeout fires is the
//! expected case, not a failure.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::common::config::SmokeConfig;
use crate::common::{Error, Result};

use super::config::{server_command, SmokeScenario};
use super::process::run_cmd;

/// Settings shared by every scenario in a run
#[derive(Debug, Clone)]
pub struct SmokeOptions {
    /// Server binary, as given on the command line or in PATH
    pub server: String,
    pub timeout: Duration,
    /// Print captured output for every scenario, not only failures
    pub verbose: bool,
}

impl SmokeOptions {
    pub fn from_config(config: &SmokeConfig) -> Self {
        Self {
            server: config.server.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            verbose: false,
        }
    }

    /// Process name for `killall`: the file name of the server binary
    pub fn server_process_name(&self) -> &str {
        Path::new(&self.server)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.server)
    }
}

/// Result of one scenario
#[derive(Debug)]
pub struct SmokeReport {
    pub name: String,
    pub passed: bool,
    pub timed_out: bool,
    pub error: Option<String>,
}

/// Check that the server binary can be found
pub fn locate_server(server: &str) -> Result<()> {
    which::which(server)
        .map(|path| tracing::debug!(path = %path.display(), "detector server found"))
        .map_err(|_| Error::ServerNotFound(server.to_string()))
}

/// Run one scenario against the detector server
pub async fn run_scenario(scenario: &SmokeScenario, options: &SmokeOptions) -> Result<SmokeReport> {
    println!(
        "\n{} {}",
        "Running Smoke Test:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    let cmd = server_command(&options.server, &scenario.device)?;
    if options.verbose {
        println!("  $ {}", cmd.dimmed());
    }

    let output = run_cmd(&cmd, options.timeout, options.server_process_name()).await?;
    if output.timed_out {
        println!(
            "  {} server still running after {}s, killed",
            "•".cyan(),
            options.timeout.as_secs()
        );
    }

    let check = scenario.effective_expectation().check(&output.text);

    if options.verbose || check.is_err() {
        println!("{}", "  Output:".cyan());
        for line in output.text.lines() {
            println!("    {}", line.dimmed());
        }
    }

    let report = match check {
        Ok(()) => {
            println!("  {} {}", "✓".green(), "Passed".green().bold());
            SmokeReport {
                name: scenario.name.clone(),
                passed: true,
                timed_out: output.timed_out,
                error: None,
            }
        }
        // A bad pattern is a scenario bug, not a server failure
        Err(e @ Error::InvalidPattern { .. }) => return Err(e),
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            SmokeReport {
                name: scenario.name.clone(),
                passed: false,
                timed_out: output.timed_out,
                error: Some(e.to_string()),
            }
        }
    };

    tracing::info!(
        scenario = %report.name,
        passed = report.passed,
        timed_out = report.timed_out,
        "smoke scenario finished"
    );

    Ok(report)
}

/// Run scenarios in order, returning every report
pub async fn run_all(scenarios: &[SmokeScenario], options: &SmokeOptions) -> Result<Vec<SmokeReport>> {
    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        reports.push(run_scenario(scenario, options).await?);
    }
    Ok(reports)
}
