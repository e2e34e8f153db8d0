use std::sync::RwLock;

use once_cell::sync::OnceCell;
use softrouter_lib::types::wan::WanStore;

use crate::config::{self, ConfigError};

static STORE: OnceCell<RwLock<WanStore>> = OnceCell::new();

fn path() -> Result<std::path::PathBuf, ConfigError> {
    Ok(config::config_dir()?.join("multi_wan.json"))
}

pub fn init() -> Result<(), ConfigError> {
    if STORE.get().is_some() {
        return Ok(());
    }
    let loaded = config::load_json_or_default(&path()?, WanStore::default());
    let _ = STORE.set(RwLock::new(loaded));
    Ok(())
}

pub fn get() -> WanStore {
    STORE
        .get()
        .expect("wan store not initialized")
        .read()
        .expect("wan store lock poisoned")
        .clone()
}

pub fn replace(store: WanStore) -> Result<(), ConfigError> {
    let lock = STORE.get().expect("wan store not initialized");
    let mut guard = lock.write().expect("wan store lock poisoned");
    *guard = store;
    config::write_atomic(&path()?, &*guard)
}
