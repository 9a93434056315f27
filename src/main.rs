//! sls-tools - operational tools for SLS detector servers
//!
//! `restart` kills a detector server on its controller over telnet so that
//! it respawns; `smoke` starts the Karabo detector server locally and checks
//! its startup log.

use clap::Parser;
use slstools::commands::Commands;
use slstools::{cli, common::logging};

#[derive(Parser)]
#[command(name = "sls-tools", about = "Operational tools for SLS detector servers")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "sls-tools".to_string());

    match cli::dispatch(cli.command, &program).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
