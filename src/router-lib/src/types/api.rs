use serde::{Deserialize, Serialize};

use crate::types::interfaces::KernelInterface;

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceListEntry {
    pub name: String,
    pub label: Option<String>,
    pub description: String,
    pub color: String,
    pub kernel: Option<KernelInterface>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelRequest {
    pub interface_name: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VlanCreateRequest {
    pub parent_interface: String,
    pub vlan_id: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct VlanCreateResponse {
    pub interface: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpAddressRequest {
    pub interface_name: String,
    pub ip_address: String,
    pub action: IpAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpAction {
    Add,
    Del,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkStateRequest {
    pub interface_name: String,
    pub state: LinkDesiredState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDesiredState {
    Up,
    Down,
}

/// Entry recorded in the Privileged Executor's in-memory audit ring.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub binary: String,
    pub args: Vec<String>,
    pub success: bool,
    pub error: Option<String>,
}
