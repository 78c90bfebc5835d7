//! Basic smoke tests for the `parport` binary.
use std::io::{Read, Write};
use std::process::{Command, Stdio};

fn parport() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parport"));
    cmd.env("PARPORT_LOGGING_LEVEL", "error")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_command_lists_verbs() {
    let mut child = parport()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start binary");

    {
        let stdin = child.stdin.as_mut().expect("stdin available");
        stdin.write_all(b"{\"command\": \"help\"}\nexit\n").unwrap();
        stdin.flush().ok();
    }

    let mut collected = String::new();
    child
        .stdout
        .take()
        .expect("stdout available")
        .read_to_string(&mut collected)
        .unwrap();
    let status = child.wait().unwrap();

    assert!(status.success());
    assert!(collected.contains("write <0-255>"), "help output missing. Got: {}", collected);
}

#[test]
fn write_before_open_fails_with_usage_error() {
    let output = parport()
        .args(["write 200"])
        .output()
        .expect("failed to run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("was not opened"), "stderr: {}", stderr);
}

#[test]
fn out_of_range_value_is_rejected_in_json_mode() {
    let output = parport()
        .args(["--json", "write 256"])
        .output()
        .expect("failed to run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"UsageError\""), "stderr: {}", stderr);
}

#[test]
fn close_with_nothing_open_succeeds() {
    let output = parport()
        .args(["close", "close"])
        .output()
        .expect("failed to run binary");

    assert!(output.status.success());
}
