//! Smol utilities for logging

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

/// Make an Ascii-safe string
pub fn ascii_escape(s: &[u8]) -> String {
    s.escape_ascii().to_string()
}

/// Renders how a child process ended, for log lines
pub fn describe_exit(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit code {}", code),
        (None, Some(signal)) => format!("signal {}", signal),
        (None, None) => String::from("unknown status"),
    }
}
