use serde::{Deserialize, Serialize};

/// A LAN source routed through the VPN uplink (`tun1`) via policy
/// routing table 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpnPolicy {
    pub source: String,
    #[serde(default)]
    pub description: String,
}

pub type VpnPolicyStore = Vec<VpnPolicy>;

/// Fixed routing table id reserved for the VPN uplink, and the tunnel
/// device it steers traffic into.
pub const VPN_POLICY_TABLE: u32 = 100;
pub const VPN_TUNNEL_INTERFACE: &str = "tun1";
