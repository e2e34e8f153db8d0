use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl From<&str> for Protocol {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("udp") {
            Protocol::Udp
        } else {
            Protocol::Tcp
        }
    }
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortForwardRule {
    pub id: Uuid,
    #[serde(default)]
    pub description: String,
    pub protocol: Protocol,
    pub external_port: u16,
    pub internal_ip: String,
    pub internal_port: u16,
    pub enabled: bool,
}

/// Request body for creating a rule; `id` and `enabled` default sensibly
/// so callers only need to specify the forwarding itself.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPortForwardRule {
    #[serde(default)]
    pub description: String,
    pub protocol: String,
    pub external_port: u16,
    pub internal_ip: String,
    pub internal_port: u16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Partial update: unset fields preserve the existing value.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PortForwardRuleUpdate {
    pub description: Option<String>,
    pub protocol: Option<String>,
    pub external_port: Option<u16>,
    pub internal_ip: Option<String>,
    pub internal_port: Option<u16>,
    pub enabled: Option<bool>,
}
