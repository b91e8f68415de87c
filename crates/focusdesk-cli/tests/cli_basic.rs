//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_focusdesk"));
    cmd.env("FOCUSDESK_HOME", home).env("RUST_LOG", "warn");
    cmd
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = cli(home)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "CLI command {args:?} failed: {stderr}");
    stdout
}

#[test]
fn test_sound_defaults_on_and_toggle_persists() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_cli_success(home.path(), &["sound"]).trim(), "sound: on");
    assert_eq!(
        run_cli_success(home.path(), &["sound", "toggle"]).trim(),
        "sound: off"
    );
    assert_eq!(
        run_cli_success(home.path(), &["sound", "status"]).trim(),
        "sound: off"
    );
    assert_eq!(
        run_cli_success(home.path(), &["sound", "on"]).trim(),
        "sound: on"
    );
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(
        run_cli_success(home.path(), &["config", "get", "timer.default_duration"]).trim(),
        "25"
    );
    run_cli_success(home.path(), &["config", "set", "timer.default_duration", "50"]);
    assert_eq!(
        run_cli_success(home.path(), &["config", "get", "timer.default_duration"]).trim(),
        "50"
    );
    assert!(home.path().join("config.toml").exists());
}

#[test]
fn test_config_rejects_bad_values() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["config", "set", "timer.default_duration", "181"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, _, code) = run_cli(home.path(), &["config", "get", "nope.missing"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_list_is_json() {
    let home = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(home.path(), &["config", "list"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["storage"]["backend"], "local");
}

#[test]
fn test_sessions_and_stats_on_empty_database() {
    let home = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(home.path(), &["sessions", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(0));

    let stats: serde_json::Value =
        serde_json::from_str(&run_cli_success(home.path(), &["stats"])).unwrap();
    assert_eq!(stats["total_sessions"], 0);
}

#[test]
fn test_start_rejects_out_of_range_minutes() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["start", "--minutes", "200"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("outside 1..=180"));
}

#[test]
fn test_completed_run_is_recorded() {
    let home = tempfile::tempdir().unwrap();
    run_cli_success(home.path(), &["config", "set", "timer.tick_ms", "1"]);

    let stdout = run_cli_success(
        home.path(),
        &["start", "--minutes", "1", "--task", "t-1", "--notes", "review"],
    );
    assert!(stdout.contains("\"type\":\"TimerCompleted\""));

    let sessions: serde_json::Value = serde_json::from_str(&run_cli_success(
        home.path(),
        &["sessions", "list", "--json"],
    ))
    .unwrap();
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["completed"], true);
    assert_eq!(sessions[0]["actual_duration"], 1);
    assert_eq!(sessions[0]["notes"], "review");
}

#[test]
fn test_dry_run_writes_nothing() {
    let home = tempfile::tempdir().unwrap();
    run_cli_success(home.path(), &["config", "set", "timer.tick_ms", "1"]);

    let (stdout, stderr, code) = run_cli(home.path(), &["start", "--minutes", "1", "--dry-run"]);
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.contains("TimerCompleted"));
    assert!(stderr.contains("dry-run: Create"));

    let stdout = run_cli_success(home.path(), &["sessions", "list"]);
    assert_eq!(stdout.trim(), "no sessions recorded");
}

#[test]
fn test_stop_command_records_interrupted_run() {
    let home = tempfile::tempdir().unwrap();
    let mut child = cli(home.path())
        .args(["start", "--minutes", "30"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"s\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("TimerReset"));

    let sessions: serde_json::Value = serde_json::from_str(&run_cli_success(
        home.path(),
        &["sessions", "list", "--json"],
    ))
    .unwrap();
    assert_eq!(sessions[0]["completed"], false);
    assert_eq!(sessions[0]["actual_duration"], 0);
    assert_eq!(sessions[0]["duration"], 30);
}
