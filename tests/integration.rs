//! End-to-end tests for the sls tools
//!
//! The restart flow runs against an in-process fake telnet host; the smoke
//! flow runs against shell scripts standing in for the detector server.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use slstools::restart::{self, RestartOptions, RestartOutcome};
use slstools::smoke::{self, DeviceConfig, Expectation, SmokeOptions, SmokeScenario};
use slstools::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const TARGET: &str = "/gotthardDetectorServer -phaseshift 55";

const STARTUP_LINE: &str = "2024-03-01 10:00:00.123 [info] karabo.core.Device : \
    'Gotthard2Receiver' (version '3.1.0') with deviceId: 'MyTestGh2Recv' \
    got started on server 'karabo/sls'.";

/// Fake detector controller: negotiates, sends a `ps` listing, and returns
/// the command lines it received once the client disconnects.
async fn fake_telnet_host(listing: &'static [&'static str]) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        // IAC DO ECHO, IAC WILL SUPPRESS-GO-AHEAD, then the echoed command
        let mut reply = vec![255, 253, 1, 255, 251, 3];
        reply.extend_from_slice(b"ps\r\n");
        for line in listing {
            reply.extend_from_slice(line.as_bytes());
            reply.extend_from_slice(b"\r\n");
        }
        reply.extend_from_slice(b"# ");
        // One write so the client sees the whole listing in a single read
        let _ = stream.write_all(&reply).await;

        let mut received = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => received.extend_from_slice(&chunk[..n]),
            }
        }
        command_lines(&received)
    });

    (port, handle)
}

/// Drop 3-byte IAC sequences and split what is left into lines
fn command_lines(raw: &[u8]) -> Vec<String> {
    let mut text = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == 255 {
            i += 3;
        } else {
            text.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&text)
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn options(port: u16) -> RestartOptions {
    RestartOptions {
        hostname: "127.0.0.1".to_string(),
        port,
        connect_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_millis(300),
        process: TARGET.to_string(),
        settle: Duration::ZERO,
    }
}

/// Write an executable shell script standing in for the detector server
fn write_fake_server(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn receiver_scenario() -> SmokeScenario {
    SmokeScenario {
        name: "gh2-receiver".to_string(),
        description: None,
        device: DeviceConfig::new("MyTestGh2Recv", "Gotthard2Receiver"),
        expect: Expectation::default(),
    }
}

// ============== Restart ==============

#[tokio::test]
async fn test_restart_kills_matching_process() {
    let (port, host) = fake_telnet_host(&[
        "  PID USER       VSZ STAT COMMAND",
        "    1 root      1544 S    init",
        "   57 root      1548 S    /usr/sbin/telnetd",
        "  231 root      2080 S    /gotthardDetectorServer -phaseshift 55",
    ])
    .await;

    let outcome = restart::run(&options(port)).await.unwrap();
    assert_eq!(outcome, RestartOutcome::Killed { pid: "231".to_string() });

    let received = host.await.unwrap();
    assert_eq!(received, vec!["ps", "kill 231"]);
}

#[tokio::test]
async fn test_restart_process_not_running() {
    let (port, host) = fake_telnet_host(&[
        "  PID USER       VSZ STAT COMMAND",
        "    1 root      1544 S    init",
        "  231 root      2080 S    /gotthardDetectorServer",
    ])
    .await;

    let outcome = restart::run(&options(port)).await.unwrap();
    assert_eq!(outcome, RestartOutcome::NotFound);

    let received = host.await.unwrap();
    assert_eq!(received, vec!["ps"]);
}

#[tokio::test]
async fn test_restart_connection_refused() {
    // Bind then drop to get a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = restart::run(&options(port)).await.unwrap_err();
    assert!(matches!(err, Error::ConnectFailed { .. }), "got {err:?}");
}

#[test]
fn test_restart_without_hostname_prints_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_sls-tools"))
        .arg("restart")
        .env("SLS_TOOLS_CONFIG", "/nonexistent/sls-tools.toml")
        .output()
        .expect("Failed to run sls-tools");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("restart the gotthardDetectorServer"), "{stdout}");
    assert!(stdout.contains("Usage:"), "{stdout}");
}

#[test]
fn test_restart_usage_ignores_broken_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[restart\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sls-tools"))
        .arg("restart")
        .env("SLS_TOOLS_CONFIG", &config)
        .output()
        .expect("Failed to run sls-tools");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "{stdout}");
}

#[test]
fn test_restart_with_host_reports_broken_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[restart\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sls-tools"))
        .args(["restart", "127.0.0.1"])
        .env("SLS_TOOLS_CONFIG", &config)
        .output()
        .expect("Failed to run sls-tools");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid configuration file"), "{stderr}");
}

// ============== Smoke ==============

#[tokio::test]
async fn test_smoke_passes_on_startup_line() {
    let dir = tempfile::tempdir().unwrap();
    let server = write_fake_server(
        dir.path(),
        "fake-sls-server-ok",
        &format!("echo \"{STARTUP_LINE}\""),
    );

    let options = SmokeOptions {
        server: server.display().to_string(),
        timeout: Duration::from_secs(5),
        verbose: false,
    };

    let report = smoke::run_scenario(&receiver_scenario(), &options).await.unwrap();
    assert!(report.passed, "{:?}", report.error);
    assert!(!report.timed_out);
}

#[tokio::test]
async fn test_smoke_timeout_still_checks_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let server = write_fake_server(
        dir.path(),
        "fake-sls-server-hang",
        &format!("echo \"{STARTUP_LINE}\" >&2\nsleep 5"),
    );

    let options = SmokeOptions {
        server: server.display().to_string(),
        timeout: Duration::from_secs(1),
        verbose: false,
    };

    let report = smoke::run_scenario(&receiver_scenario(), &options).await.unwrap();
    assert!(report.timed_out);
    assert!(report.passed, "{:?}", report.error);
}

#[tokio::test]
async fn test_smoke_fails_without_startup_line() {
    let dir = tempfile::tempdir().unwrap();
    let server = write_fake_server(
        dir.path(),
        "fake-sls-server-broken",
        "echo \"[error] karabo.core.Device : failed to connect to broker\"",
    );

    let options = SmokeOptions {
        server: server.display().to_string(),
        timeout: Duration::from_secs(5),
        verbose: false,
    };

    let report = smoke::run_scenario(&receiver_scenario(), &options).await.unwrap();
    assert!(!report.passed);
    assert!(report.error.is_some());
}

#[tokio::test]
async fn test_smoke_server_receives_init_json() {
    let dir = tempfile::tempdir().unwrap();
    // Print the argument back so the expectation sees what the server got
    let server = write_fake_server(dir.path(), "fake-sls-server-echo", "echo \"$1\"");

    let options = SmokeOptions {
        server: server.display().to_string(),
        timeout: Duration::from_secs(5),
        verbose: false,
    };

    let mut scenario = receiver_scenario();
    scenario.expect =
        Expectation::contains(r#"init={"MyTestGh2Recv":{"classId":"Gotthard2Receiver"}}"#);

    let report = smoke::run_scenario(&scenario, &options).await.unwrap();
    assert!(report.passed, "{:?}", report.error);
}

#[test]
fn test_smoke_list() {
    let output = Command::new(env!("CARGO_BIN_EXE_sls-tools"))
        .args(["smoke", "--list"])
        .env("SLS_TOOLS_CONFIG", "/nonexistent/sls-tools.toml")
        .output()
        .expect("Failed to run sls-tools");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gh2-control"), "{stdout}");
    assert!(stdout.contains("gh2-receiver"), "{stdout}");
}

#[test]
fn test_smoke_list_ignores_broken_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[restart\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sls-tools"))
        .args(["smoke", "--list"])
        .env("SLS_TOOLS_CONFIG", &config)
        .output()
        .expect("Failed to run sls-tools");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gh2-control"), "{stdout}");
}

#[test]
fn test_smoke_missing_server_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_sls-tools"))
        .args(["smoke", "--server", "sls-tools-no-such-server"])
        .env("SLS_TOOLS_CONFIG", "/nonexistent/sls-tools.toml")
        .output()
        .expect("Failed to run sls-tools");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found in PATH"), "{stderr}");
}

// ============== Real detector server ==============

#[tokio::test]
#[ignore = "requires karabo-sls-detector-server"]
async fn test_gh2_builtin_scenarios() {
    if smoke::locate_server("karabo-sls-detector-server").is_err() {
        eprintln!("Skipping test: karabo-sls-detector-server not available");
        return;
    }

    let options = SmokeOptions {
        server: "karabo-sls-detector-server".to_string(),
        timeout: Duration::from_secs(10),
        verbose: true,
    };

    let reports = smoke::run_all(&smoke::builtin_scenarios(), &options).await.unwrap();
    for report in reports {
        assert!(report.passed, "{}: {:?}", report.name, report.error);
    }
}
