use std::sync::RwLock;

use once_cell::sync::OnceCell;
use softrouter_lib::types::interfaces::{InterfaceLabel, InterfaceMetadata, InterfaceMetadataStore};

use crate::config::{self, ConfigError};

static STORE: OnceCell<RwLock<InterfaceMetadataStore>> = OnceCell::new();

fn path() -> Result<std::path::PathBuf, ConfigError> {
    Ok(config::config_dir()?.join("interface_metadata.json"))
}

pub fn init() -> Result<(), ConfigError> {
    if STORE.get().is_some() {
        return Ok(());
    }
    let loaded = config::load_json_or_default(&path()?, InterfaceMetadataStore::new());
    let _ = STORE.set(RwLock::new(loaded));
    Ok(())
}

pub fn all() -> InterfaceMetadataStore {
    STORE
        .get()
        .expect("interface store not initialized")
        .read()
        .expect("interface store lock poisoned")
        .clone()
}

pub fn label(
    interface: &str,
    label: InterfaceLabel,
    description: String,
    color: String,
) -> Result<(), ConfigError> {
    let lock = STORE.get().expect("interface store not initialized");
    let mut guard = lock.write().expect("interface store lock poisoned");
    guard.insert(
        interface.to_string(),
        InterfaceMetadata {
            label,
            description,
            color,
        },
    );
    config::write_atomic(&path()?, &*guard)
}

/// Names of interfaces currently labeled [`InterfaceLabel::Wan`].
pub fn wan_interfaces() -> Vec<String> {
    all()
        .into_iter()
        .filter(|(_, m)| m.label == InterfaceLabel::Wan)
        .map(|(name, _)| name)
        .collect()
}

/// Names of interfaces labeled anything that should be treated as a LAN
/// side for forwarding/accept purposes (LAN, DMZ, Guest).
pub fn lan_like_interfaces() -> Vec<String> {
    all()
        .into_iter()
        .filter(|(_, m)| {
            matches!(
                m.label,
                InterfaceLabel::Lan | InterfaceLabel::Dmz | InterfaceLabel::Guest
            )
        })
        .map(|(name, _)| name)
        .collect()
}
