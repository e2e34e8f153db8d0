use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QosMode {
    #[default]
    None,
    Cake,
    Htb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QosEntry {
    pub mode: QosMode,
    /// e.g. `"100mbit"`, passed verbatim to `tc`.
    pub upload_rate: String,
    pub download_rate: String,
    #[serde(default)]
    pub overhead_bytes: Option<u32>,
}

/// Keyed by interface name.
pub type QosStore = BTreeMap<String, QosEntry>;
