use std::sync::RwLock;

use once_cell::sync::OnceCell;
use softrouter_lib::types::vpn_policy::{VpnPolicy, VpnPolicyStore};

use crate::config::{self, ConfigError};

static STORE: OnceCell<RwLock<VpnPolicyStore>> = OnceCell::new();

fn path() -> Result<std::path::PathBuf, ConfigError> {
    Ok(config::config_dir()?.join("vpn_policies.json"))
}

pub fn init() -> Result<(), ConfigError> {
    if STORE.get().is_some() {
        return Ok(());
    }
    let loaded = config::load_json_or_default(&path()?, VpnPolicyStore::new());
    let _ = STORE.set(RwLock::new(loaded));
    Ok(())
}

pub fn all() -> VpnPolicyStore {
    STORE
        .get()
        .expect("vpn policy store not initialized")
        .read()
        .expect("vpn policy store lock poisoned")
        .clone()
}

pub fn add(policy: VpnPolicy) -> Result<(), ConfigError> {
    let lock = STORE.get().expect("vpn policy store not initialized");
    let mut guard = lock.write().expect("vpn policy store lock poisoned");
    guard.push(policy);
    config::write_atomic(&path()?, &*guard)
}

pub fn remove(source: &str) -> Result<(), ConfigError> {
    let lock = STORE.get().expect("vpn policy store not initialized");
    let mut guard = lock.write().expect("vpn policy store lock poisoned");
    guard.retain(|p| p.source != source);
    config::write_atomic(&path()?, &*guard)
}
