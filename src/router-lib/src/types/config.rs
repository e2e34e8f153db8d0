use serde::{Deserialize, Serialize};

use crate::full_version;

/// Top-level on-disk config document (`config.yaml`), versioned so future
/// releases can migrate older files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub agent: AgentConfig,
}

impl From<&AgentConfig> for ConfigFile {
    fn from(agent: &AgentConfig) -> Self {
        ConfigFile {
            version: full_version!().into(),
            agent: agent.clone(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            version: full_version!().into(),
            agent: AgentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    pub web: AgentWeb,
    pub system: SystemConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWeb {
    #[serde(default = "default_bind_address")]
    pub address: String,
    pub http: AgentWebHttp,
    pub https: AgentWebHttps,
    pub password: Password,
}

impl Default for AgentWeb {
    fn default() -> Self {
        AgentWeb {
            address: default_bind_address(),
            http: AgentWebHttp {
                enabled: true,
                port: 8090,
            },
            https: AgentWebHttps {
                enabled: false,
                port: 8443,
                tls_cert: String::new(),
                tls_key: String::new(),
            },
            password: Password {
                enabled: false,
                hash: String::new(),
            },
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWebHttp {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWebHttps {
    pub enabled: bool,
    pub port: u16,
    #[serde(default)]
    pub tls_cert: String,
    #[serde(default)]
    pub tls_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Password {
    pub enabled: bool,
    #[serde(default)]
    pub hash: String,
}

/// System-wide behavior described in the Data Model section of the
/// expanded spec: protected LAN subnet, ad blocking, VPN uplink reachability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_protected_subnet")]
    pub protected_subnet: String,
    #[serde(default)]
    pub ad_blocker: AdBlocker,
    #[serde(default)]
    pub cloudflare_token: String,
    #[serde(default = "default_openvpn_port")]
    pub openvpn_port: u16,
    pub web_access: WebAccess,
    pub vpn_server: VpnServer,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            protected_subnet: default_protected_subnet(),
            ad_blocker: AdBlocker::None,
            cloudflare_token: String::new(),
            openvpn_port: default_openvpn_port(),
            web_access: WebAccess::default(),
            vpn_server: VpnServer::default(),
        }
    }
}

fn default_protected_subnet() -> String {
    "192.168.1.0/24".to_string()
}

fn default_openvpn_port() -> u16 {
    1194
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdBlocker {
    #[default]
    None,
    Adguard,
    Pihole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebAccess {
    #[serde(default)]
    pub allow_wan: bool,
    #[serde(default = "default_wan_http")]
    pub wan_port_http: u16,
    #[serde(default = "default_wan_https")]
    pub wan_port_https: u16,
}

impl Default for WebAccess {
    fn default() -> Self {
        WebAccess {
            allow_wan: false,
            wan_port_http: default_wan_http(),
            wan_port_https: default_wan_https(),
        }
    }
}

fn default_wan_http() -> u16 {
    8080
}
fn default_wan_https() -> u16 {
    8443
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VpnEndpointType {
    #[default]
    Auto,
    Ip,
    Hostname,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VpnServer {
    #[serde(default)]
    pub endpoint_type: VpnEndpointType,
    #[serde(default)]
    pub endpoint: String,
}
