//! Integration tests for the `tivoctl` CLI binary.
//!
//! Argument parsing, help output, completions, config profiles and error
//! exit codes, plus a few commands driven against a loopback stand-in for
//! the DVR.
#![allow(clippy::unwrap_used)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `tivoctl` binary with env isolation.
///
/// Clears all `TIVOCTL_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn tivoctl_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tivoctl");
    cmd.env("HOME", "/tmp/tivoctl-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/tivoctl-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("TIVOCTL_PROFILE")
        .env_remove("TIVOCTL_ADDRESS")
        .env_remove("TIVOCTL_PORT")
        .env_remove("TIVOCTL_TIMEOUT")
        .env_remove("TIVOCTL_CONFIG")
        .env_remove("TIVOCTL_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// `tivoctl_cmd` bound to a config file.
fn with_config(path: &Path) -> assert_cmd::Command {
    let mut cmd = tivoctl_cmd();
    cmd.arg("--config").arg(path);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Accept one connection, hand it to `serve`, and return what it returns.
fn fake_dvr<T: Send + 'static>(
    serve: impl FnOnce(std::net::TcpStream) -> T + Send + 'static,
) -> (u16, thread::JoinHandle<T>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve(stream)
    });
    (port, handle)
}

/// Read one `\r`-terminated command.
fn read_command(stream: &mut std::net::TcpStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while stream.read(&mut byte).unwrap() == 1 {
        if byte[0] == b'\r' {
            break;
        }
        line.push(byte[0]);
    }
    String::from_utf8(line).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = tivoctl_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    tivoctl_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("TiVo")
            .and(predicate::str::contains("discover"))
            .and(predicate::str::contains("press"))
            .and(predicate::str::contains("channel")),
    );
}

#[test]
fn test_version_flag() {
    tivoctl_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tivoctl"));
}

#[test]
fn test_completions_each_shell() {
    for shell in ["bash", "zsh", "fish"] {
        tivoctl_cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("tivoctl"));
    }
}

#[test]
fn test_invalid_output_format() {
    let output = tivoctl_cmd()
        .args(["--output", "xml", "buttons"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_buttons_plain_lists_names() {
    tivoctl_cmd()
        .args(["buttons", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("guide\n")
                .and(predicate::str::contains("channel-up"))
                .and(predicate::str::contains("num7")),
        );
}

#[test]
fn test_buttons_json_shows_wire_command() {
    tivoctl_cmd()
        .args(["buttons", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"IRCODE LIVETV\"")
                .and(predicate::str::contains("\"KEYBOARD VIDEO_ON_DEMAND\"")),
        );
}

#[test]
fn test_config_default_output_applies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[defaults]\noutput = \"plain\"\n").unwrap();

    with_config(&path)
        .arg("buttons")
        .assert()
        .success()
        .stdout(predicate::str::contains("guide\n").and(predicate::str::contains("╭").not()));

    // An explicit flag still wins.
    with_config(&path)
        .args(["buttons", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"IRCODE GUIDE\""));
}

#[test]
fn test_invalid_config_default_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[defaults]\noutput = \"xml\"\n").unwrap();

    let output = with_config(&path).arg("buttons").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("defaults.output"));
}

// ── Target resolution errors ────────────────────────────────────────

#[test]
fn test_no_target_is_usage_error() {
    let output = tivoctl_cmd().args(["press", "guide"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("No DVR selected"));
}

#[test]
fn test_unknown_profile_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let output = with_config(&dir.path().join("config.toml"))
        .args(["--profile", "attic", "watch"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("attic"));
}

#[test]
fn test_unknown_button_fails_before_connecting() {
    // Nothing listens on the address; the typo must be caught first.
    let output = tivoctl_cmd()
        .args(["--address", "127.0.0.1", "--port", "9", "press", "guide", "warp"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Unknown button 'warp'"));
}

#[test]
fn test_refused_connection_exit_code() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let output = tivoctl_cmd()
        .args(["--address", "127.0.0.1", "--port", &port.to_string(), "ir", "guide"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

// ── Config profiles ─────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tivoctl.toml");
    with_config(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tivoctl.toml"));
}

#[test]
fn test_config_add_use_remove() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    with_config(&path)
        .args(["config", "add", "den", "192.168.1.20", "--label", "Den"])
        .assert()
        .success();
    with_config(&path)
        .args(["config", "add", "office", "192.168.1.21"])
        .assert()
        .success();

    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.contains("default_profile = \"den\""), "{saved}");
    assert!(saved.contains("192.168.1.21"), "{saved}");

    with_config(&path)
        .args(["config", "use", "office"])
        .assert()
        .success();
    with_config(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile = \"office\""));

    with_config(&path)
        .args(["config", "remove", "den"])
        .assert()
        .success();
    let output = with_config(&path)
        .args(["config", "use", "den"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

// ── Against a loopback DVR ──────────────────────────────────────────

#[test]
fn test_ir_sends_uppercased_code() {
    let (port, server) = fake_dvr(|mut stream| {
        let mut received = Vec::new();
        stream.read_to_end(&mut received).unwrap();
        received
    });

    tivoctl_cmd()
        .args(["--address", "127.0.0.1", "--port", &port.to_string(), "ir", "guide"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Sent IRCODE GUIDE"));

    assert_eq!(server.join().unwrap(), b"IRCODE GUIDE\r");
}

#[test]
fn test_channel_wait_reports_confirmation() {
    let (port, server) = fake_dvr(|mut stream| {
        // Status for the old channel first, as on connect.
        stream.write_all(b"CH_STATUS 0007 LOCAL\r\n").unwrap();
        let command = read_command(&mut stream);
        stream.write_all(b"CH_STATUS 0042 REMOTE\r\n").unwrap();
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        command
    });

    tivoctl_cmd()
        .args([
            "--address",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "channel",
            "42",
            "--wait",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Now on channel 0042 (REMOTE)"));

    assert_eq!(server.join().unwrap(), "SETCH 42");
}

#[test]
fn test_channel_refusal_is_appliance_error() {
    let (port, server) = fake_dvr(|mut stream| {
        let command = read_command(&mut stream);
        stream.write_all(b"CH_FAILED NO_LIVE\r\n").unwrap();
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        command
    });

    let output = tivoctl_cmd()
        .args([
            "--address",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "channel",
            "42",
            "--subchannel",
            "1",
            "--force",
            "--wait",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("NO_LIVE"));
    assert_eq!(server.join().unwrap(), "FORCECH 42 1");
}
