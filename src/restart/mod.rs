//! Remote restart of a detector server
//!
//! The detector controller's init system respawns the server when it dies,
//! so "restart" means: find it in the remote `ps` listing and kill it.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::config::RestartConfig;
use crate::common::Result;
use crate::telnet::TelnetSession;

/// Line terminator used by the remote shell
const LINE_END: &[u8] = b"\r\n";

/// Command listing remote processes
const LIST_COMMAND: &str = "ps";

/// A remote line-oriented shell
#[async_trait]
pub trait RemoteShell: Send {
    /// Send one command line
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Read one line; an empty string means nothing arrived within `timeout`
    async fn read_line(&mut self, timeout: Duration) -> Result<String>;
}

#[async_trait]
impl<S> RemoteShell for TelnetSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_line(&mut self, line: &str) -> Result<()> {
        TelnetSession::write_line(self, line).await
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<String> {
        self.read_until(LINE_END, timeout).await
    }
}

/// Settings for one restart run
#[derive(Debug, Clone)]
pub struct RestartOptions {
    pub hostname: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Substring identifying the process in `ps` output
    pub process: String,
    /// Pause after sending `kill`
    pub settle: Duration,
}

impl RestartOptions {
    /// Options for `hostname` with every other value taken from `config`
    pub fn from_config(hostname: impl Into<String>, config: &RestartConfig) -> Self {
        Self {
            hostname: hostname.into(),
            port: config.port,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            process: config.process.clone(),
            settle: Duration::from_millis(config.settle_ms),
        }
    }
}

/// What a restart run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// `kill <pid>` was sent
    Killed { pid: String },
    /// The listing ended without a matching line
    NotFound,
}

/// The leading whitespace-delimited token of a `ps` line
pub fn extract_pid(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Whether a `ps` line belongs to the target process
pub fn matches_target(line: &str, target: &str) -> bool {
    line.contains(target)
}

/// List processes on `shell` and kill the first one matching `target`
///
/// Stops at the first match, or when a read returns nothing within
/// `read_timeout`.
pub async fn restart_process<R: RemoteShell + ?Sized>(
    shell: &mut R,
    target: &str,
    hostname: &str,
    read_timeout: Duration,
    settle: Duration,
) -> Result<RestartOutcome> {
    shell.write_line(LIST_COMMAND).await?;

    loop {
        let line = shell.read_line(read_timeout).await?;

        if line.is_empty() {
            break;
        }

        if !matches_target(&line, target) {
            tracing::trace!(line = line.trim_end(), "skipping");
            continue;
        }

        let Some(pid) = extract_pid(&line) else {
            break;
        };
        let pid = pid.to_string();
        let command = format!("kill {pid}");

        println!("Executing '{command}' on {hostname}");
        shell.write_line(&command).await?;
        tracing::info!(host = hostname, pid = %pid, "kill sent");

        // Let the remote shell act on the command before the session drops
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        return Ok(RestartOutcome::Killed { pid });
    }

    println!("Process '{target}' not found on {hostname}");
    Ok(RestartOutcome::NotFound)
}

/// Connect to the host and restart the configured process
pub async fn run(options: &RestartOptions) -> Result<RestartOutcome> {
    let mut session =
        TelnetSession::connect(&options.hostname, options.port, options.connect_timeout).await?;
    println!("Connected to {}", options.hostname);

    restart_process(
        &mut session,
        &options.process,
        &options.hostname,
        options.read_timeout,
        options.settle,
    )
    .await
}
