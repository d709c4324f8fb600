//! CLI smoke tests.
//!
//! These exercise flag parsing and startup validation through the built
//! binary; none of them open a connection.

use std::process::Command;

/// Get the path to the lsptap binary.
fn binary_path() -> String {
    let mut path = std::env::current_exe()
        .expect("Failed to get current exe")
        .parent()
        .expect("Failed to get parent directory")
        .to_path_buf();

    // Go up from the deps directory.
    if path.ends_with("deps") {
        path.pop();
    }

    path.join("lsptap").to_string_lossy().to_string()
}

#[test]
fn help_describes_the_tool() {
    let output = Command::new(binary_path())
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pass-through proxy"));
    assert!(stdout.contains("--client-port"));
    assert!(stdout.contains("--server-port"));
    assert!(stdout.contains("--log-format"));
}

#[test]
fn version_prints_the_name() {
    let output = Command::new(binary_path())
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("lsptap"));
}

#[test]
fn no_flags_fails_with_nonzero_exit() {
    let output = Command::new(binary_path())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("can't guess --mode"), "{stderr}");
}

#[test]
fn conflicting_flags_fail_validation() {
    let output = Command::new(binary_path())
        .args(["--mode", "nexus", "--protocol", "tcp", "--client-port", "9001"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no --server-port"), "{stderr}");
}

#[test]
fn unknown_format_is_rejected_by_parsing() {
    let output = Command::new(binary_path())
        .args(["--server-port", "9002", "--log-format", "simple"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
