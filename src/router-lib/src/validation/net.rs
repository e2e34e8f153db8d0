use std::net::IpAddr;
use std::sync::LazyLock;

use ipnet::IpNet;
use regex::Regex;

use super::error::ValidationError;

static INTERFACE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,16}$").unwrap());

pub fn validate_interface_name(name: &str) -> Result<(), ValidationError> {
    if INTERFACE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InterfaceName(name.to_string()))
    }
}

/// Accepts either a bare IP address or a CIDR network, matching the
/// permissiveness of `ip addr add`/`ip route add` themselves.
pub fn validate_address_or_cidr(value: &str) -> Result<(), ValidationError> {
    if value.parse::<IpAddr>().is_ok() || value.parse::<IpNet>().is_ok() {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress(value.to_string()))
    }
}

pub fn validate_cidr(value: &str) -> Result<IpNet, ValidationError> {
    value
        .parse::<IpNet>()
        .map_err(|_| ValidationError::InvalidAddress(value.to_string()))
}

pub fn validate_vlan_id(id: u16) -> Result<(), ValidationError> {
    if (1..=4094).contains(&id) {
        Ok(())
    } else {
        Err(ValidationError::VlanIdOutOfRange(id))
    }
}

pub fn validate_port(port: u32) -> Result<u16, ValidationError> {
    if (1..=65535).contains(&port) {
        Ok(port as u16)
    } else {
        Err(ValidationError::InvalidPort(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_interface_names() {
        assert!(validate_interface_name("eth0").is_ok());
        assert!(validate_interface_name("eth0.100").is_ok());
        assert!(validate_interface_name("wg-quickrs0").is_ok());
    }

    #[test]
    fn rejects_shell_metacharacters_in_interface_names() {
        assert!(validate_interface_name("eth0; rm -rf /").is_err());
        assert!(validate_interface_name("").is_err());
        assert!(validate_interface_name(&"a".repeat(17)).is_err());
    }

    #[test]
    fn accepts_ip_and_cidr() {
        assert!(validate_address_or_cidr("192.168.1.1").is_ok());
        assert!(validate_address_or_cidr("192.168.1.0/24").is_ok());
        assert!(validate_address_or_cidr("not-an-ip").is_err());
    }

    #[test]
    fn vlan_bounds() {
        assert!(validate_vlan_id(1).is_ok());
        assert!(validate_vlan_id(4094).is_ok());
        assert!(validate_vlan_id(0).is_err());
        assert!(validate_vlan_id(4095).is_err());
    }
}
