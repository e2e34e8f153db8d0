//! Lockout-safe commit pipeline: validate out-of-line, snapshot, apply,
//! then arm a confirmation watchdog that rolls back if nobody calls
//! [`confirm`] in time.

use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use once_cell::sync::Lazy;
use thiserror::Error;
use tokio::sync::oneshot;

use super::synth::{self, SynthInput};
use crate::config::{self, ConfigError};
use crate::executor::{self, ExecutorError};
use crate::stores;

const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60);

const BOOT_SAFE_FALLBACK: &str = "flush ruleset\n\
table inet emergency {\n\
    chain input {\n\
        type filter hook input priority filter; policy accept;\n\
        iif lo accept\n\
        ct state established,related accept\n\
        tcp dport 22 accept\n\
        ip protocol icmp accept\n\
        ip6 nexthdr icmpv6 accept\n\
    }\n\
    chain forward {\n\
        type filter hook forward priority filter; policy drop;\n\
        ct state established,related accept\n\
    }\n\
}\n";

const DEAD_MAN_SWITCH_RULESET: &str = "table inet softrouter_deadman {\n\
    chain input {\n\
        type filter hook input priority -200; policy accept;\n\
        iif lo accept\n\
        ct state established,related accept\n\
        tcp dport 22 accept\n\
        ip protocol icmp accept\n\
        ip6 nexthdr icmpv6 accept\n\
    }\n\
}\n";

static PIPELINE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static WATCHDOG: Lazy<Mutex<Option<PendingCommit>>> = Lazy::new(|| Mutex::new(None));

/// Armed between a successful apply and operator confirmation (or
/// watchdog expiry). Carries both the rollback snapshot and the ruleset
/// that was just applied, since the latter is only persisted as
/// known-good once the operator confirms reachability.
struct PendingCommit {
    cancel: oneshot::Sender<()>,
    ruleset: String,
}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to persist temp ruleset file: {0}")]
    Persist(#[from] tempfile::PathPersistError),
    #[error("no WAN interface configured")]
    NoWanConfigured,
    #[error("ruleset validation failed (preserved at {path:?}): {stderr}")]
    ValidationFailed { path: PathBuf, stderr: String },
    #[error("ruleset apply failed: {0}")]
    ApplyFailed(String),
    #[error("rollback failed after apply failure; boot-safe fallback was applied: {0}")]
    RollbackFailed(String),
    #[error("no active confirmation watchdog")]
    NoActiveWatchdog,
}

fn good_ruleset_path() -> Result<PathBuf, ConfigError> {
    Ok(config::config_dir()?.join("firewall.good.nft"))
}

fn write_and_validate(ruleset: &str) -> Result<PathBuf, CommitError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("softrouter-ruleset-")
        .suffix(".nft")
        .tempfile()?;
    tmp.write_all(ruleset.as_bytes())?;
    tmp.flush()?;
    let path = tmp.into_temp_path();

    let path_str = path.to_string_lossy().to_string();
    if let Err(e) = executor::run(&["nft", "-c", "-f", &path_str]) {
        let kept = path.keep().unwrap_or_else(|_| PathBuf::from(path_str.clone()));
        log::error!("ruleset validation failed; preserved at {:?}", kept);
        return Err(CommitError::ValidationFailed {
            path: kept,
            stderr: e.to_string(),
        });
    }
    Ok(path.keep()?)
}

fn apply_text(path: &str) -> Result<(), ExecutorError> {
    executor::run(&["nft", "-f", path]).map(|_| ())
}

/// Applies the hard-coded boot-safe fallback. Never fails loudly: if even
/// this can't be written, the process logs CRITICAL and continues
/// running so the next commit attempt has a chance to succeed.
fn apply_boot_safe_fallback() {
    match tempfile::NamedTempFile::new() {
        Ok(mut f) => {
            if f.write_all(BOOT_SAFE_FALLBACK.as_bytes()).is_ok() {
                let path = f.path().to_string_lossy().to_string();
                if let Err(e) = apply_text(&path) {
                    log::error!("CRITICAL: boot-safe fallback failed to apply: {}", e);
                }
            }
        }
        Err(e) => log::error!("CRITICAL: could not write boot-safe fallback file: {}", e),
    }
}

fn rollback(snapshot: &str) -> Result<(), CommitError> {
    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(snapshot.as_bytes())?;
    let path = tmp.path().to_string_lossy().to_string();
    apply_text(&path).map_err(|e| CommitError::RollbackFailed(e.to_string()))
}

fn rollback_or_fallback(snapshot: &str) {
    if let Err(e) = rollback(snapshot) {
        log::error!(
            "CRITICAL: {}; applying boot-safe fallback",
            e
        );
        apply_boot_safe_fallback();
    }
}

/// Runs the full commit sequence described in the Commit Pipeline
/// section. Serialized: only one `apply()` is ever in flight.
pub fn apply() -> Result<(), CommitError> {
    let _pipeline_guard = PIPELINE_LOCK.lock().expect("pipeline lock poisoned");

    let mut wan_interfaces = stores::interfaces::wan_interfaces();
    if wan_interfaces.is_empty() {
        match synth::detect_default_wan() {
            Some(w) => wan_interfaces.push(w),
            None => return Err(CommitError::NoWanConfigured),
        }
    }
    let lan_interfaces = stores::interfaces::lan_like_interfaces();
    let cfg = config::get_config()?;
    let system = cfg.agent.system;
    let tls_port = cfg.agent.web.https.port;
    let port_forwards = stores::portforward::enabled();

    let ruleset = synth::synthesize(&SynthInput {
        wan_interfaces,
        lan_interfaces,
        port_forwards,
        system,
        tls_port,
    });

    let snapshot = executor::run_stdout(&["nft", "list", "ruleset"]).unwrap_or_default();

    let validated_path = write_and_validate(&ruleset)?;
    let path_str = validated_path.to_string_lossy().to_string();

    // Dead-man switch: emergency-access table at a lower hook priority,
    // protecting the window between validation and the next `flush
    // ruleset`. It does not survive the commit it protects — see the
    // design notes on this in the expanded spec.
    install_dead_man_switch();

    if let Err(e) = apply_text(&path_str) {
        rollback_or_fallback(&snapshot);
        let _ = fs::remove_file(&validated_path);
        return Err(CommitError::ApplyFailed(e.to_string()));
    }
    let _ = fs::remove_file(&validated_path);
    remove_dead_man_switch();

    arm_watchdog(snapshot, ruleset);

    Ok(())
}

/// Adds the dead-man supplementary table by handing a ruleset file to
/// `nft -f`, the same mechanism [`apply_text`] uses — not by passing
/// `{`, `}`, `;` as literal `nft add chain` arguments, which the
/// executor's metacharacter screen rejects outright.
fn install_dead_man_switch() {
    match tempfile::NamedTempFile::new() {
        Ok(mut f) => {
            if f.write_all(DEAD_MAN_SWITCH_RULESET.as_bytes()).is_ok() {
                let path = f.path().to_string_lossy().to_string();
                if let Err(e) = apply_text(&path) {
                    log::warn!("failed to install dead-man switch table: {}", e);
                }
            }
        }
        Err(e) => log::warn!("could not write dead-man switch ruleset file: {}", e),
    }
}

/// Removes the dead-man table after a successful apply. In practice the
/// main ruleset's leading `flush ruleset` has already erased it by the
/// time this runs, so the delete is best-effort: its only real job is to
/// clean up after an apply that somehow left it behind.
fn remove_dead_man_switch() {
    executor::run_best_effort(&["nft", "delete", "table", "inet", "softrouter_deadman"]);
}

fn persist_known_good(ruleset: &str) -> Result<(), CommitError> {
    let path = good_ruleset_path()?;
    fs::write(&path, ruleset)?;
    #[cfg(unix)]
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

fn arm_watchdog(snapshot: String, ruleset: String) {
    let (tx, rx) = oneshot::channel();
    {
        let mut guard = WATCHDOG.lock().expect("watchdog lock poisoned");
        *guard = Some(PendingCommit {
            cancel: tx,
            ruleset,
        });
    }
    tokio::spawn(async move {
        tokio::select! {
            _ = rx => {
                log::info!("commit confirmed; watchdog cancelled");
            }
            _ = tokio::time::sleep(WATCHDOG_TIMEOUT) => {
                log::warn!("commit watchdog expired without confirmation; rolling back");
                {
                    let mut guard = WATCHDOG.lock().expect("watchdog lock poisoned");
                    *guard = None;
                }
                rollback_or_fallback(&snapshot);
            }
        }
    });
}

/// Cancels the active watchdog and persists the just-applied ruleset as
/// known-good. Known-good is only ever written here, not at apply time:
/// a ruleset that locks the operator out and is rolled back by the
/// watchdog must never become the boot-time recovery target.
/// Idempotent: a second call after the first succeeds (or after expiry)
/// returns [`CommitError::NoActiveWatchdog`].
pub fn confirm() -> Result<(), CommitError> {
    let pending = {
        let mut guard = WATCHDOG.lock().expect("watchdog lock poisoned");
        guard.take()
    };
    match pending {
        Some(PendingCommit { cancel, ruleset }) => {
            let _ = cancel.send(());
            persist_known_good(&ruleset)?;
            Ok(())
        }
        None => Err(CommitError::NoActiveWatchdog),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_safe_fallback_accepts_ssh_and_drops_forward() {
        assert!(BOOT_SAFE_FALLBACK.contains("tcp dport 22 accept"));
        assert!(BOOT_SAFE_FALLBACK.contains("hook forward priority filter; policy drop"));
        assert!(BOOT_SAFE_FALLBACK.starts_with("flush ruleset"));
    }

    #[test]
    fn confirm_without_watchdog_errors() {
        // Ensure a clean slate regardless of test execution order.
        let _ = WATCHDOG.lock().expect("watchdog lock poisoned").take();
        assert!(matches!(confirm(), Err(CommitError::NoActiveWatchdog)));
    }

    #[test]
    fn dead_man_switch_ruleset_does_not_flush_and_allows_emergency_access() {
        assert!(!DEAD_MAN_SWITCH_RULESET.starts_with("flush ruleset"));
        assert!(DEAD_MAN_SWITCH_RULESET.contains("priority -200"));
        assert!(DEAD_MAN_SWITCH_RULESET.contains("tcp dport 22 accept"));
        assert!(DEAD_MAN_SWITCH_RULESET.contains("policy accept"));
    }

    #[tokio::test]
    async fn confirm_persists_known_good_only_after_watchdog_armed() {
        let dir = tempfile::tempdir().unwrap();
        let _ = config::CONFIG_DIR.set(dir.path().to_path_buf());

        arm_watchdog("old ruleset".to_string(), "new ruleset".to_string());
        assert!(confirm().is_ok());

        let persisted = fs::read_to_string(good_ruleset_path().unwrap()).unwrap();
        assert_eq!(persisted, "new ruleset");

        // The watchdog was consumed by the first confirm; a second call
        // finds nothing pending.
        assert!(matches!(confirm(), Err(CommitError::NoActiveWatchdog)));
    }
}
