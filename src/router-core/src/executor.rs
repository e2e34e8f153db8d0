//! Sole gateway to `std::process::Command`. No other module in this
//! crate may spawn a process directly.

use std::collections::VecDeque;
use std::process::{Command, Output};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use softrouter_lib::types::api::AuditEntry;
use thiserror::Error;

const ALLOWED_BINARIES: &[&str] = &[
    "nft",
    "sysctl",
    "ip",
    "tc",
    "systemctl",
    "wg",
    "cloudflared",
    "ping",
    "traceroute",
    "journalctl",
    "curl",
    "pihole",
    "cscli",
];

const BLOCKED_CHARS: &[char] = &[
    ';', '|', '&', '`', '$', '<', '>', '\n', '\r', '(', ')', '{', '}',
];

const AUDIT_RING_CAPACITY: usize = 100;

static AUDIT_RING: Lazy<Mutex<VecDeque<AuditEntry>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(AUDIT_RING_CAPACITY)));

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("empty command")]
    Empty,
    #[error("'{0}' is not on the privileged command allow-list")]
    NotAllowed(String),
    #[error("argument '{0}' contains a disallowed shell metacharacter")]
    UnsafeArgument(String),
    #[error("io error running {0}: {1}")]
    Io(String, std::io::Error),
    #[error("{binary} {args} failed: {stderr}", args = .args.join(" "))]
    Failed {
        binary: String,
        args: Vec<String>,
        stderr: String,
    },
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

fn screen_args(args: &[&str]) -> ExecutorResult<()> {
    for arg in args {
        if arg.chars().any(|c| BLOCKED_CHARS.contains(&c)) {
            return Err(ExecutorError::UnsafeArgument(arg.to_string()));
        }
    }
    Ok(())
}

fn record(binary: &str, args: &[&str], success: bool, error: Option<String>) {
    let entry = AuditEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        binary: binary.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        success,
        error,
    };
    let mut ring = AUDIT_RING.lock().expect("audit ring mutex poisoned");
    if ring.len() == AUDIT_RING_CAPACITY {
        ring.pop_front();
    }
    ring.push_back(entry);
}

/// Returns a snapshot of the last [`AUDIT_RING_CAPACITY`] invocations, most
/// recent last, for `GET /api/system/audit`.
pub fn audit_snapshot() -> Vec<AuditEntry> {
    AUDIT_RING
        .lock()
        .expect("audit ring mutex poisoned")
        .iter()
        .cloned()
        .collect()
}

/// Runs `args[0]` with `args[1..]`, returning the full process [`Output`].
/// This is the only function in the crate allowed to construct a
/// [`Command`].
pub fn run(args: &[&str]) -> ExecutorResult<Output> {
    let (binary, rest) = args
        .split_first()
        .ok_or(ExecutorError::Empty)?;

    if !ALLOWED_BINARIES.contains(binary) {
        record(binary, rest, false, Some("not on allow-list".to_string()));
        return Err(ExecutorError::NotAllowed(binary.to_string()));
    }
    if let Err(e) = screen_args(rest) {
        record(binary, rest, false, Some(e.to_string()));
        return Err(e);
    }

    log::debug!("[+] {}", args.join(" "));
    let output = Command::new(binary)
        .args(rest)
        .output()
        .map_err(|e| {
            record(binary, rest, false, Some(e.to_string()));
            ExecutorError::Io(binary.to_string(), e)
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        log::warn!("{} failed: {}", args.join(" "), stderr);
        record(binary, rest, false, Some(stderr.clone()));
        return Err(ExecutorError::Failed {
            binary: binary.to_string(),
            args: rest.iter().map(|s| s.to_string()).collect(),
            stderr,
        });
    }

    log::debug!(
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout).trim()
    );
    record(binary, rest, true, None);
    Ok(output)
}

/// Runs the command and returns trimmed stdout as a `String`. Convenience
/// wrapper over [`run`] for the common "capture stdout" case.
pub fn run_stdout(args: &[&str]) -> ExecutorResult<String> {
    let output = run(args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Runs the command and returns stdout and stderr concatenated into a
/// single trimmed string, for callers that want to show both streams to
/// an operator (e.g. diagnostics output) without caring which is which.
/// Part of the executor's three-operation surface even though nothing
/// in this crate's current call sites needs combined capture yet.
#[allow(dead_code)]
pub fn run_combined(args: &[&str]) -> ExecutorResult<String> {
    let output = run(args)?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(combined.trim().to_string())
}

/// Runs the command, discarding output, treating both success and
/// "already applied" failures the same way (idempotent best-effort step).
/// Used for cleanup operations per §9 where the source ignores errors
/// from inherently idempotent commands.
pub fn run_best_effort(args: &[&str]) {
    if let Err(e) = run(args) {
        log::debug!("best-effort command failed (ignored): {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_binaries_not_on_allow_list() {
        let err = run(&["rm", "-rf", "/"]).unwrap_err();
        assert!(matches!(err, ExecutorError::NotAllowed(_)));
    }

    #[test]
    fn rejects_shell_metacharacters() {
        let err = run(&["ip", "link show; rm -rf /"]).unwrap_err();
        assert!(matches!(err, ExecutorError::UnsafeArgument(_)));
    }

    #[test]
    fn rejects_empty_command() {
        let err = run(&[]).unwrap_err();
        assert!(matches!(err, ExecutorError::Empty));
    }

    #[test]
    fn audit_ring_records_rejections() {
        let before = audit_snapshot().len();
        let _ = run(&["rm", "-rf", "/"]);
        let after = audit_snapshot();
        assert!(after.len() >= before);
        assert_eq!(after.last().unwrap().binary, "rm");
        assert!(!after.last().unwrap().success);
    }
}
