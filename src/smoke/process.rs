//! Shell command execution with an overall timeout
//!
//! The detector server never exits on its own, so hitting the timeout is the
//! normal way a smoke run ends. On timeout the shell is killed, any leftover
//! server processes are `killall -9`'d, and the output captured so far is
//! returned.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::common::{trim_trailing_newlines, Error, Result};

/// Size of each stdout read
const READ_CHUNK: usize = 8192;

/// Captured console output of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr, trailing newlines stripped
    pub text: String,
    /// Whether the timeout fired
    pub timed_out: bool,
    /// Exit code if the command finished by itself
    pub exit_code: Option<i32>,
}

/// Run `cmd` through `sh -c`, stderr merged into stdout
///
/// `cleanup_process` is the process name passed to `killall -9` if the
/// timeout fires.
pub async fn run_cmd(cmd: &str, timeout: Duration, cleanup_process: &str) -> Result<CommandOutput> {
    tracing::debug!(cmd, timeout_secs = timeout.as_secs(), "running command");

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(format!("exec 2>&1; {cmd}"))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::spawn_failed(cmd, e))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::spawn_failed(cmd, "stdout not captured"))?;

    let mut captured = Vec::new();
    let finished = tokio::time::timeout(timeout, async {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = stdout.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            captured.extend_from_slice(&chunk[..n]);
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>(status)
    })
    .await;

    let (timed_out, exit_code) = match finished {
        Ok(Ok(status)) => (false, status.code()),
        Ok(Err(e)) => return Err(Error::spawn_failed(cmd, e)),
        Err(_) => {
            tracing::warn!(cmd, "command timed out, killing '{cleanup_process}'");
            let _ = child.start_kill();
            kill_all(cleanup_process).await;
            let _ = child.wait().await;
            (true, None)
        }
    };

    let text = String::from_utf8_lossy(&captured);
    Ok(CommandOutput {
        text: trim_trailing_newlines(&text).to_string(),
        timed_out,
        exit_code,
    })
}

/// Force-kill every process called `name`
///
/// Failure here is logged only: a missing `killall` or no matching process
/// must not turn a timed-out run into an error.
pub async fn kill_all(name: &str) {
    let result = Command::new("killall")
        .arg("-9")
        .arg(name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) => tracing::debug!(name, ?status, "killall finished"),
        Err(e) => tracing::warn!(name, "killall failed: {e}"),
    }
}
