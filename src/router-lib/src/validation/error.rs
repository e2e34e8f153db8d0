use thiserror::Error;

/// `InvalidArgument` from the error taxonomy: user input rejected before
/// any privileged command is ever considered.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid interface name: {0}")]
    InterfaceName(String),
    #[error("invalid CIDR or IP address: {0}")]
    InvalidAddress(String),
    #[error("VLAN id {0} out of range (must be 1-4094)")]
    VlanIdOutOfRange(u16),
    #[error("invalid port: {0}")]
    InvalidPort(u32),
    #[error("unknown action: {0}")]
    UnknownAction(String),
}
