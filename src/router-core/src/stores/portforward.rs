use std::sync::RwLock;

use once_cell::sync::OnceCell;
use softrouter_lib::types::portforward::{
    NewPortForwardRule, PortForwardRule, PortForwardRuleUpdate, Protocol,
};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{self, ConfigError};

static STORE: OnceCell<RwLock<Vec<PortForwardRule>>> = OnceCell::new();

#[derive(Error, Debug)]
pub enum PortForwardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no port-forwarding rule with id {0}")]
    NotFound(Uuid),
}

fn path() -> Result<std::path::PathBuf, ConfigError> {
    Ok(config::config_dir()?.join("port_forwarding.json"))
}

pub fn init() -> Result<(), ConfigError> {
    if STORE.get().is_some() {
        return Ok(());
    }
    let loaded = config::load_json_or_default(&path()?, Vec::new());
    let _ = STORE.set(RwLock::new(loaded));
    Ok(())
}

pub fn all() -> Vec<PortForwardRule> {
    STORE
        .get()
        .expect("port-forwarding store not initialized")
        .read()
        .expect("port-forwarding store lock poisoned")
        .clone()
}

/// Enabled rules only, in the order the synthesizer should emit them.
pub fn enabled() -> Vec<PortForwardRule> {
    all().into_iter().filter(|r| r.enabled).collect()
}

fn persist(guard: &[PortForwardRule]) -> Result<(), PortForwardError> {
    config::write_atomic(&path()?, &guard.to_vec())?;
    Ok(())
}

pub fn add(new_rule: NewPortForwardRule) -> Result<PortForwardRule, PortForwardError> {
    let rule = PortForwardRule {
        id: Uuid::new_v4(),
        description: new_rule.description,
        protocol: Protocol::from(new_rule.protocol.as_str()),
        external_port: new_rule.external_port,
        internal_ip: new_rule.internal_ip,
        internal_port: new_rule.internal_port,
        enabled: new_rule.enabled,
    };
    let lock = STORE.get().expect("port-forwarding store not initialized");
    let mut guard = lock.write().expect("port-forwarding store lock poisoned");
    guard.push(rule.clone());
    persist(&guard)?;
    Ok(rule)
}

/// Applies a partial update in place; unset fields preserve the prior
/// value (no `Protocol` variant to fall back on, so protocol only
/// changes when explicitly present).
pub fn apply_update(rule: &mut PortForwardRule, patch: PortForwardRuleUpdate) {
    if let Some(description) = patch.description {
        rule.description = description;
    }
    if let Some(protocol) = patch.protocol {
        rule.protocol = Protocol::from(protocol.as_str());
    }
    if let Some(external_port) = patch.external_port {
        rule.external_port = external_port;
    }
    if let Some(internal_ip) = patch.internal_ip {
        rule.internal_ip = internal_ip;
    }
    if let Some(internal_port) = patch.internal_port {
        rule.internal_port = internal_port;
    }
    if let Some(enabled) = patch.enabled {
        rule.enabled = enabled;
    }
}

pub fn update(
    id: Uuid,
    patch: PortForwardRuleUpdate,
) -> Result<PortForwardRule, PortForwardError> {
    let lock = STORE.get().expect("port-forwarding store not initialized");
    let mut guard = lock.write().expect("port-forwarding store lock poisoned");
    let rule = guard
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(PortForwardError::NotFound(id))?;
    apply_update(rule, patch);
    let updated = rule.clone();
    persist(&guard)?;
    Ok(updated)
}

pub fn remove(id: Uuid) -> Result<(), PortForwardError> {
    let lock = STORE.get().expect("port-forwarding store not initialized");
    let mut guard = lock.write().expect("port-forwarding store lock poisoned");
    let before = guard.len();
    guard.retain(|r| r.id != id);
    if guard.len() == before {
        return Err(PortForwardError::NotFound(id));
    }
    persist(&guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> PortForwardRule {
        PortForwardRule {
            id: Uuid::new_v4(),
            description: "ssh".into(),
            protocol: Protocol::Tcp,
            external_port: 2222,
            internal_ip: "10.0.0.5".into(),
            internal_port: 22,
            enabled: true,
        }
    }

    #[test]
    fn update_preserves_enabled_when_unspecified() {
        let mut r = rule();
        apply_update(
            &mut r,
            PortForwardRuleUpdate {
                description: Some("ssh box".into()),
                ..Default::default()
            },
        );
        assert!(r.enabled);
        assert_eq!(r.description, "ssh box");
    }

    #[test]
    fn update_can_disable_rule() {
        let mut r = rule();
        apply_update(
            &mut r,
            PortForwardRuleUpdate {
                enabled: Some(false),
                ..Default::default()
            },
        );
        assert!(!r.enabled);
    }

    #[test]
    fn protocol_normalizes_unknown_values_to_tcp() {
        assert_eq!(Protocol::from("sctp"), Protocol::Tcp);
        assert_eq!(Protocol::from("udp"), Protocol::Udp);
        assert_eq!(Protocol::from("UDP"), Protocol::Udp);
    }
}
