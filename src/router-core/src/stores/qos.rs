use std::sync::RwLock;

use once_cell::sync::OnceCell;
use softrouter_lib::types::qos::{QosEntry, QosStore};

use crate::config::{self, ConfigError};

static STORE: OnceCell<RwLock<QosStore>> = OnceCell::new();

fn path() -> Result<std::path::PathBuf, ConfigError> {
    Ok(config::config_dir()?.join("qos_config.json"))
}

pub fn init() -> Result<(), ConfigError> {
    if STORE.get().is_some() {
        return Ok(());
    }
    let loaded = config::load_json_or_default(&path()?, QosStore::new());
    let _ = STORE.set(RwLock::new(loaded));
    Ok(())
}

pub fn all() -> QosStore {
    STORE
        .get()
        .expect("qos store not initialized")
        .read()
        .expect("qos store lock poisoned")
        .clone()
}

pub fn set(interface: &str, entry: QosEntry) -> Result<(), ConfigError> {
    let lock = STORE.get().expect("qos store not initialized");
    let mut guard = lock.write().expect("qos store lock poisoned");
    guard.insert(interface.to_string(), entry);
    config::write_atomic(&path()?, &*guard)
}

pub fn remove(interface: &str) -> Result<(), ConfigError> {
    let lock = STORE.get().expect("qos store not initialized");
    let mut guard = lock.write().expect("qos store lock poisoned");
    guard.remove(interface);
    config::write_atomic(&path()?, &*guard)
}
