//! CLI command handling
//!
//! Resolves options from flags and the config file, runs the command, and
//! maps the outcome to an exit status.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::restart::{self, RestartOptions};
use crate::smoke::{self, ScenarioFile, SmokeOptions, SmokeScenario};

/// Shown when `restart` is run without a hostname
const RESTART_ABOUT: &str = "This script will restart the gotthardDetectorServer on the given host.";

/// Dispatch a CLI command, returning the process exit code
///
/// The config file is read only after the usage and listing early returns,
/// so a broken config file never hides them.
pub async fn dispatch(command: Commands, program: &str) -> Result<i32> {
    match command {
        Commands::Restart {
            hostname,
            port,
            timeout,
            read_timeout,
            process,
            settle_ms,
        } => {
            let Some(hostname) = hostname else {
                println!("{RESTART_ABOUT}");
                println!("Usage: {program} restart <hostname>");
                return Ok(0);
            };

            let config = Config::load()?;
            let mut options = RestartOptions::from_config(hostname, &config.restart);
            if let Some(port) = port {
                options.port = port;
            }
            if let Some(secs) = timeout {
                options.connect_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = read_timeout {
                options.read_timeout = Duration::from_secs(secs);
            }
            if let Some(process) = process {
                options.process = process;
            }
            if let Some(ms) = settle_ms {
                options.settle = Duration::from_millis(ms);
            }

            // Not finding the process is reported, not failed
            restart::run(&options).await?;
            Ok(0)
        }

        Commands::Smoke {
            names,
            file,
            server,
            timeout,
            list,
            verbose,
        } => {
            let scenarios = collect_scenarios(file.as_deref())?;

            if list {
                print_scenarios(&scenarios);
                return Ok(0);
            }

            let selected = select_scenarios(scenarios, &names)?;

            let config = Config::load()?;
            let mut options = SmokeOptions::from_config(&config.smoke);
            if let Some(server) = server {
                options.server = server;
            }
            if let Some(secs) = timeout {
                options.timeout = Duration::from_secs(secs);
            }
            options.verbose = verbose;

            smoke::locate_server(&options.server)?;

            let reports = smoke::run_all(&selected, &options).await?;
            let failed = reports.iter().filter(|r| !r.passed).count();

            println!();
            for report in &reports {
                if report.passed {
                    println!("  {} {}", "✓".green(), report.name);
                } else {
                    println!("  {} {}", "✗".red(), report.name);
                }
            }
            println!(
                "\n{} passed, {} failed",
                (reports.len() - failed).to_string().green(),
                failed.to_string().red()
            );

            Ok(if failed == 0 { 0 } else { 1 })
        }
    }
}

/// Built-in scenarios followed by those from `file`
pub fn collect_scenarios(file: Option<&Path>) -> Result<Vec<SmokeScenario>> {
    let mut scenarios = smoke::builtin_scenarios();
    if let Some(path) = file {
        let loaded = ScenarioFile::load(path)?;
        tracing::debug!(count = loaded.scenarios.len(), path = %path.display(), "loaded scenarios");
        scenarios.extend(loaded.scenarios);
    }
    Ok(scenarios)
}

/// Keep the scenarios named in `names`, in that order; all when empty
pub fn select_scenarios(scenarios: Vec<SmokeScenario>, names: &[String]) -> Result<Vec<SmokeScenario>> {
    if names.is_empty() {
        return Ok(scenarios);
    }

    names
        .iter()
        .map(|name| {
            scenarios
                .iter()
                .find(|s| &s.name == name)
                .cloned()
                .ok_or_else(|| Error::UnknownScenario(name.clone()))
        })
        .collect()
}

fn print_scenarios(scenarios: &[SmokeScenario]) {
    println!("Smoke scenarios:");
    for scenario in scenarios {
        println!(
            "  {:<16} {} ({})",
            scenario.name,
            scenario.device.class_id,
            scenario.description.as_deref().unwrap_or("").dimmed()
        );
    }
}
