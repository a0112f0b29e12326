//! CLI integration tests

use std::process::Command;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "co-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Cloud Optimize"), "Should show app name");
    assert!(stdout.contains("view"), "Should show view command");
    assert!(stdout.contains("instances"), "Should show instances command");
    assert!(stdout.contains("config"), "Should show config command");
    assert!(stdout.contains("region"), "Should show region command");
    assert!(stdout.contains("snapshots"), "Should show snapshots command");
    assert!(stdout.contains("status"), "Should show status command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("co"), "Should show binary name");
}

/// Test view subcommand help
#[test]
fn test_view_help() {
    let output = run_cli(&["view", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "View help should succeed");
    assert!(stdout.contains("--yearly"), "Should show yearly option");
}

/// Test config set subcommand help
#[test]
fn test_config_set_help() {
    let output = run_cli(&["config", "set", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Config set help should succeed");
    assert!(stdout.contains("--trigger"), "Should show trigger option");
    assert!(stdout.contains("regroup"), "Should list trigger values");
    assert!(stdout.contains("recalc"), "Should list trigger values");
}

/// Test that config set requires at least one assignment
#[test]
fn test_config_set_requires_assignments() {
    let output = run_cli(&["config", "set"]);

    assert!(!output.status.success(), "Config set without fields should fail");
}

/// Test that an unreachable daemon is reported as an error
#[test]
fn test_unreachable_daemon_fails() {
    let output = run_cli(&["--api-url", "http://127.0.0.1:9", "view"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "View against no daemon should fail");
    assert!(
        stderr.contains("Failed to send request"),
        "Should explain the failure"
    );
}

/// Test invalid output format
#[test]
fn test_invalid_format() {
    let output = run_cli(&["--format", "yaml", "view"]);

    assert!(!output.status.success(), "Unknown format should fail");
}
