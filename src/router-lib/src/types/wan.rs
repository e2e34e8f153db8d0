use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WanMode {
    #[default]
    Failover,
    LoadBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Unknown,
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanLink {
    pub interface: String,
    #[serde(default)]
    pub display_name: String,
    pub gateway: String,
    pub check_target: String,
    pub priority: u16,
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub enabled: bool,
    #[serde(default)]
    pub observed_state: LinkState,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WanStore {
    pub mode: WanMode,
    pub interfaces: Vec<WanLink>,
}

impl WanStore {
    /// Links eligible for route installation: enabled and reachable.
    pub fn online_enabled(&self) -> impl Iterator<Item = &WanLink> {
        self.interfaces
            .iter()
            .filter(|l| l.enabled && l.observed_state == LinkState::Online)
    }
}
