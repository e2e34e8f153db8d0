//! Interface Config Operations: VLAN lifecycle, address add/remove, link
//! state. Every operation validates before touching the executor; no
//! privileged command runs on invalid input.

use softrouter_lib::validation::error::ValidationError;
use softrouter_lib::validation::net::{validate_address_or_cidr, validate_interface_name, validate_vlan_id};
use thiserror::Error;

use crate::executor::{self, ExecutorError};

#[derive(Error, Debug)]
pub enum InterfaceOpError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("VLAN interface name must be of the form <parent>.<id>")]
    MalformedVlanName,
}

pub fn create_vlan(parent: &str, vlan_id: u16) -> Result<String, InterfaceOpError> {
    validate_interface_name(parent)?;
    validate_vlan_id(vlan_id)?;

    let name = format!("{parent}.{vlan_id}");
    executor::run(&[
        "ip", "link", "add", "link", parent, "name", &name, "type", "vlan", "id",
        &vlan_id.to_string(),
    ])?;
    executor::run(&["ip", "link", "set", &name, "up"])?;
    Ok(name)
}

pub fn delete_vlan(name: &str) -> Result<(), InterfaceOpError> {
    validate_interface_name(name)?;
    if !name.contains('.') {
        return Err(InterfaceOpError::MalformedVlanName);
    }
    executor::run(&["ip", "link", "del", name])?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrAction {
    Add,
    Del,
}

pub fn set_address(
    interface: &str,
    address: &str,
    action: AddrAction,
) -> Result<(), InterfaceOpError> {
    validate_interface_name(interface)?;
    validate_address_or_cidr(address)?;
    let verb = match action {
        AddrAction::Add => "add",
        AddrAction::Del => "del",
    };
    executor::run(&["ip", "addr", verb, address, "dev", interface])?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

pub fn set_link_state(interface: &str, state: LinkState) -> Result<(), InterfaceOpError> {
    validate_interface_name(interface)?;
    let verb = match state {
        LinkState::Up => "up",
        LinkState::Down => "down",
    };
    executor::run(&["ip", "link", "set", interface, verb])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_vlan_rejects_non_vlan_names() {
        let err = delete_vlan("eth0").unwrap_err();
        assert!(matches!(err, InterfaceOpError::MalformedVlanName));
    }

    #[test]
    fn create_vlan_rejects_out_of_range_id() {
        let err = create_vlan("eth0", 5000).unwrap_err();
        assert!(matches!(err, InterfaceOpError::Validation(_)));
    }

    #[test]
    fn create_vlan_rejects_unsafe_interface_name() {
        let err = create_vlan("eth0; rm -rf /", 100).unwrap_err();
        assert!(matches!(err, InterfaceOpError::Validation(_)));
    }
}
